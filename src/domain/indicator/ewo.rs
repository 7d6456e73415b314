//! Elliott Wave Oscillator and the trailing volume reference.
//!
//! EWO(fast, slow) = (EMA(fast) - EMA(slow)) / close * 100.
//! Warmup: max(fast, slow) - 1.
//!
//! VOLUME_MEAN(n)[i] = mean of volume[i-n..i], i.e. the n candles before the
//! current one. Warmup: n.

use crate::domain::indicator::ema::ema;
use crate::domain::indicator::{sma, undefined};

pub fn ewo(close: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast_ma = ema(close, fast);
    let slow_ma = ema(close, slow);
    (0..close.len())
        .map(|i| {
            if close[i] == 0.0 {
                f64::NAN
            } else {
                (fast_ma[i] - slow_ma[i]) / close[i] * 100.0
            }
        })
        .collect()
}

pub fn volume_mean(volume: &[f64], period: usize) -> Vec<f64> {
    let trailing = sma(volume, period);
    let mut out = undefined(volume.len());
    for i in 1..volume.len() {
        out[i] = trailing[i - 1];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::leading_undefined;

    #[test]
    fn ewo_warmup_is_slow_period() {
        let close: Vec<f64> = (0..250).map(|i| 100.0 + i as f64 * 0.1).collect();
        assert_eq!(leading_undefined(&ewo(&close, 50, 200)), 199);
    }

    #[test]
    fn ewo_flat_is_zero() {
        let out = ewo(&[10.0; 30], 5, 20);
        assert!(out[29].abs() < 1e-10);
    }

    #[test]
    fn ewo_positive_in_uptrend() {
        let close: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert!(ewo(&close, 5, 35)[59] > 0.0);
    }

    #[test]
    fn volume_mean_excludes_current_candle() {
        let out = volume_mean(&[1.0, 2.0, 3.0, 4.0, 100.0], 4);
        assert_eq!(leading_undefined(&out), 4);
        assert!((out[4] - 2.5).abs() < 1e-10);
    }
}
