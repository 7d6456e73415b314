//! Bollinger Bands.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! Two derived series are also produced:
//! - percent: (X - Lower) / (Upper - Lower)
//! - width: (Upper - Lower) / Middle
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) values are undefined.

use crate::domain::indicator::sma;
use crate::domain::indicator::stddev::stddev;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
    pub percent: Vec<f64>,
    pub width: Vec<f64>,
}

pub fn bollinger(values: &[f64], period: usize, stddev_mult_x100: u32) -> BollingerBands {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let middle = sma(values, period);
    let deviation = stddev(values, period);

    let upper: Vec<f64> = middle
        .iter()
        .zip(&deviation)
        .map(|(m, d)| m + mult * d)
        .collect();
    let lower: Vec<f64> = middle
        .iter()
        .zip(&deviation)
        .map(|(m, d)| m - mult * d)
        .collect();

    let percent = (0..values.len())
        .map(|i| {
            let range = upper[i] - lower[i];
            if range == 0.0 {
                f64::NAN
            } else {
                (values[i] - lower[i]) / range
            }
        })
        .collect();
    let width = (0..values.len())
        .map(|i| {
            if middle[i] == 0.0 {
                f64::NAN
            } else {
                (upper[i] - lower[i]) / middle[i]
            }
        })
        .collect();

    BollingerBands {
        upper,
        middle,
        lower,
        percent,
        width,
    }
}
