//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n defined values, then
//! EMA[i] = X[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values after the input's own warm-up are undefined.

use crate::domain::indicator::undefined;

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = undefined(values.len());
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    let seed_idx = start + period - 1;
    if seed_idx >= values.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut current = values[start..=seed_idx].iter().sum::<f64>() / period as f64;
    out[seed_idx] = current;
    for i in (seed_idx + 1)..values.len() {
        current = values[i] * k + current * (1.0 - k);
        out[i] = current;
    }
    out
}
