//! Stochastic oscillators and the Fisher transform.
//!
//! STOCH(k, s, d): raw %K = 100 * (C - LL(k)) / (HH(k) - LL(k)),
//! slow %K = SMA(raw %K, s), slow %D = SMA(slow %K, d).
//! Both outputs start together. Warmup (k-1) + (s-1) + (d-1).
//!
//! STOCHRSI(n, k, d): the fast stochastic of RSI(n),
//! fast %K = 100 * (RSI - min(RSI, k)) / (max(RSI, k) - min(RSI, k)),
//! fast %D = SMA(fast %K, d). Warmup n + (k-1) + (d-1).
//!
//! FISHER(x) = 0.5 * ln((1 + x) / (1 - x)), with non-finite results
//! (including the input's warm-up) replaced by 0.

use crate::domain::indicator::rsi::rsi;
use crate::domain::indicator::{rolling_max, rolling_min, sma};
use crate::domain::ohlcv::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct Stochastic {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

fn position_in_range(value: f64, low: f64, high: f64) -> f64 {
    if value.is_nan() || low.is_nan() || high.is_nan() {
        f64::NAN
    } else if high == low {
        0.0
    } else {
        100.0 * (value - low) / (high - low)
    }
}

/// Blank `k` wherever `d` is still undefined.
fn align(mut k: Vec<f64>, d: Vec<f64>) -> Stochastic {
    for (kv, dv) in k.iter_mut().zip(&d) {
        if dv.is_nan() {
            *kv = f64::NAN;
        }
    }
    Stochastic { k, d }
}

pub fn stoch(candles: &[Candle], k_period: usize, k_smooth: usize, d_period: usize) -> Stochastic {
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let hh = rolling_max(&highs, k_period);
    let ll = rolling_min(&lows, k_period);

    let raw: Vec<f64> = candles
        .iter()
        .enumerate()
        .map(|(i, c)| position_in_range(c.close, ll[i], hh[i]))
        .collect();
    let k = sma(&raw, k_smooth);
    let d = sma(&k, d_period);
    align(k, d)
}

pub fn stochrsi(values: &[f64], rsi_period: usize, k_period: usize, d_period: usize) -> Stochastic {
    let r = rsi(values, rsi_period);
    let hi = rolling_max(&r, k_period);
    let lo = rolling_min(&r, k_period);
    let k: Vec<f64> = (0..r.len())
        .map(|i| position_in_range(r[i], lo[i], hi[i]))
        .collect();
    let d = sma(&k, d_period);
    align(k, d)
}

pub fn fisher(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|x| {
            let f = 0.5 * ((1.0 + x) / (1.0 - x)).ln();
            if f.is_finite() { f } else { 0.0 }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::leading_undefined;
    use chrono::{Duration, NaiveDate};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                timestamp: start + Duration::minutes(5 * i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1.0,
            })
            .collect()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 50.0 + (i as f64 * 0.5).sin() * 10.0).collect()
    }

    #[test]
    fn stoch_warmup() {
        let out = stoch(&candles(&wave(40)), 5, 3, 3);
        assert_eq!(leading_undefined(&out.k), 8);
        assert_eq!(leading_undefined(&out.d), 8);
    }

    #[test]
    fn stoch_bounded() {
        let out = stoch(&candles(&wave(60)), 5, 3, 3);
        assert!(out.k[8..].iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn stochrsi_warmup() {
        let out = stochrsi(&wave(60), 14, 5, 3);
        assert_eq!(leading_undefined(&out.k), 20);
        assert_eq!(leading_undefined(&out.d), 20);
    }

    #[test]
    fn fisher_known_values() {
        let out = fisher(&[0.0, 0.5, f64::NAN, 1.0, 80.0]);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5 * 3.0f64.ln()).abs() < 1e-10);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
        // ratio is negative, log undefined
        assert_eq!(out[4], 0.0);
    }
}
