//! Average True Range.
//!
//! TR[i] = max(H[i] - L[i], |H[i] - C[i-1]|, |L[i] - C[i-1]|) for i >= 1.
//! Seed: mean of TR[1..=n], then Wilder smoothing
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first n values are undefined.

use crate::domain::indicator::undefined;
use crate::domain::ohlcv::Candle;

/// True range per candle; undefined at index 0 (no previous close).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut out = undefined(candles.len());
    for i in 1..candles.len() {
        out[i] = candles[i].true_range(candles[i - 1].close);
    }
    out
}

pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = undefined(candles.len());
    if period == 0 || candles.len() <= period {
        return out;
    }

    let tr = true_range(candles);
    let mut current = tr[1..=period].iter().sum::<f64>() / period as f64;
    out[period] = current;
    for i in (period + 1)..candles.len() {
        current = (current * (period - 1) as f64 + tr[i]) / period as f64;
        out[i] = current;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_candles(hlc: &[(f64, f64, f64)]) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        hlc.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| Candle {
                timestamp: start + Duration::minutes(5 * i as i64),
                open: close,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn atr_basic() {
        let candles = make_candles(&[
            (12.0, 10.0, 11.0),
            (13.0, 11.0, 12.0),
            (14.0, 12.0, 13.0),
            (15.0, 13.0, 14.0),
        ]);
        let out = atr(&candles, 2);
        assert!(out[1].is_nan());
        // TR[1] = TR[2] = 2
        assert!((out[2] - 2.0).abs() < 1e-10);
        assert!((out[3] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn atr_wilder_smoothing_with_gap() {
        let candles = make_candles(&[
            (10.0, 9.0, 10.0),
            (11.0, 10.0, 10.5),
            (11.0, 10.0, 10.5),
            (20.0, 19.0, 19.5),
        ]);
        let out = atr(&candles, 2);
        // TR: _, 1, 1, 9.5 (gap from 10.5 to 20)
        assert!((out[2] - 1.0).abs() < 1e-10);
        assert!((out[3] - (1.0 + 9.5) / 2.0).abs() < 1e-10);
    }

    #[test]
    fn atr_too_short() {
        let candles = make_candles(&[(2.0, 1.0, 1.5), (2.0, 1.0, 1.5)]);
        assert!(atr(&candles, 2).iter().all(|v| v.is_nan()));
    }
}
