//! Directional movement family (Wilder).
//!
//! One-bar moves: up = H[i] - H[i-1], down = L[i-1] - L[i].
//! +DM1 = up when up > down and up > 0, else 0; -DM1 mirrors it.
//!
//! - PLUS_DM / MINUS_DM: Wilder running sum seeded with the first n-1 moves,
//!   S = S - S/n + DM1. Warmup n-1.
//! - PLUS_DI / MINUS_DI: 100 * smoothed DM / smoothed TR. Warmup n.
//! - DX: 100 * |+DI - -DI| / (+DI + -DI). Warmup n.
//! - ADX: mean of the first n DX values, then Wilder average. Warmup 2n-1.
//! - ADXR: (ADX[i] + ADX[i-(n-1)]) / 2. Warmup 3n-2.

use crate::domain::indicator::undefined;
use crate::domain::ohlcv::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct Directional {
    pub plus_dm: Vec<f64>,
    pub minus_dm: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub dx: Vec<f64>,
    pub adx: Vec<f64>,
    pub adxr: Vec<f64>,
}

pub fn directional(candles: &[Candle], period: usize) -> Directional {
    let n = candles.len();
    let mut result = Directional {
        plus_dm: undefined(n),
        minus_dm: undefined(n),
        plus_di: undefined(n),
        minus_di: undefined(n),
        dx: undefined(n),
        adx: undefined(n),
        adxr: undefined(n),
    };
    if period < 2 || n < period {
        return result;
    }

    let mut dm_plus = vec![0.0; n];
    let mut dm_minus = vec![0.0; n];
    let mut tr = vec![0.0; n];
    for i in 1..n {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i - 1].low - candles[i].low;
        if up > down && up > 0.0 {
            dm_plus[i] = up;
        }
        if down > up && down > 0.0 {
            dm_minus[i] = down;
        }
        tr[i] = candles[i].true_range(candles[i - 1].close);
    }

    let p = period as f64;
    let mut s_plus: f64 = dm_plus[1..period].iter().sum();
    let mut s_minus: f64 = dm_minus[1..period].iter().sum();
    let mut s_tr: f64 = tr[1..period].iter().sum();
    result.plus_dm[period - 1] = s_plus;
    result.minus_dm[period - 1] = s_minus;

    for i in period..n {
        s_plus = s_plus - s_plus / p + dm_plus[i];
        s_minus = s_minus - s_minus / p + dm_minus[i];
        s_tr = s_tr - s_tr / p + tr[i];
        result.plus_dm[i] = s_plus;
        result.minus_dm[i] = s_minus;

        let (pdi, mdi) = if s_tr == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        };
        result.plus_di[i] = pdi;
        result.minus_di[i] = mdi;
        result.dx[i] = if pdi + mdi == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / (pdi + mdi)
        };
    }

    let first_adx = 2 * period - 1;
    if first_adx < n {
        let mut adx = result.dx[period..=first_adx].iter().sum::<f64>() / p;
        result.adx[first_adx] = adx;
        for i in (first_adx + 1)..n {
            adx = (adx * (p - 1.0) + result.dx[i]) / p;
            result.adx[i] = adx;
        }
    }

    for i in (first_adx + period - 1)..n {
        result.adxr[i] = (result.adx[i] + result.adx[i + 1 - period]) / 2.0;
    }

    result
}
