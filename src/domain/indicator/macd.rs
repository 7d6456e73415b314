//! MACD (Moving Average Convergence Divergence) and the price oscillators.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! All three MACD outputs start together once the signal line is seeded.
//! Warmup: max(fast, slow) - 1 + signal - 1 (33 for the defaults).
//!
//! APO = SMA(fast) - SMA(slow); PPO = APO / SMA(slow) * 100.
//! Warmup: max(fast, slow) - 1.

use crate::domain::indicator::ema::ema;
use crate::domain::indicator::{sma, undefined};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    if fast == 0 || slow == 0 || signal_period == 0 {
        let n = values.len();
        return Macd {
            line: undefined(n),
            signal: undefined(n),
            histogram: undefined(n),
        };
    }

    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    let mut line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_period);

    for (l, s) in line.iter_mut().zip(&signal) {
        if s.is_nan() {
            *l = f64::NAN;
        }
    }
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();

    Macd {
        line,
        signal,
        histogram,
    }
}

pub fn macd_default(values: &[f64]) -> Macd {
    macd(values, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

pub fn apo(values: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast_ma = sma(values, fast);
    let slow_ma = sma(values, slow);
    fast_ma.iter().zip(&slow_ma).map(|(f, s)| f - s).collect()
}

pub fn ppo(values: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast_ma = sma(values, fast);
    let slow_ma = sma(values, slow);
    fast_ma
        .iter()
        .zip(&slow_ma)
        .map(|(f, s)| {
            if s.is_nan() || f.is_nan() {
                f64::NAN
            } else if *s == 0.0 {
                0.0
            } else {
                (f - s) / s * 100.0
            }
        })
        .collect()
}
