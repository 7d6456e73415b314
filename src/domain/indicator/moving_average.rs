//! Moving-average family used for the offset bands.
//!
//! Five kinds share one calling convention so the catalog can build every
//! `<kind>_offset_buy` / `<kind>_offset_sell` column with one routine:
//!
//! - SMA: arithmetic mean of the last n values. Warmup n-1.
//! - EMA: see `ema`. Warmup n-1.
//! - TRIMA: SMA of an SMA, split (n+1)/2 and (n+1)/2 for odd n, n/2 and
//!   n/2+1 for even n. Warmup n-1.
//! - T3: Tillson's six-fold EMA blend with volume factor 0.7. Warmup 6(n-1).
//! - KAMA: Kaufman adaptive MA with efficiency ratio over n bars, fast 2 and
//!   slow 30 smoothing constants, seeded with the value at n-1. Warmup n.

use crate::domain::indicator::ema::ema;
use crate::domain::indicator::{sma, undefined};
use std::fmt;

/// Tillson's volume factor.
pub const T3_VFACTOR: f64 = 0.7;

const KAMA_FAST: f64 = 2.0 / 3.0;
const KAMA_SLOW: f64 = 2.0 / 31.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaKind {
    Sma,
    Ema,
    Trima,
    T3,
    Kama,
}

impl MaKind {
    pub const ALL: [MaKind; 5] = [
        MaKind::Sma,
        MaKind::Ema,
        MaKind::Trima,
        MaKind::T3,
        MaKind::Kama,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MaKind::Sma => "sma",
            MaKind::Ema => "ema",
            MaKind::Trima => "trima",
            MaKind::T3 => "t3",
            MaKind::Kama => "kama",
        }
    }

    pub fn lookback(&self, period: usize) -> usize {
        match self {
            MaKind::Sma | MaKind::Ema | MaKind::Trima => period.saturating_sub(1),
            MaKind::T3 => 6 * period.saturating_sub(1),
            MaKind::Kama => period,
        }
    }

    /// Parameter key of the multiplier applied to the buy-side average.
    pub fn low_offset_key(&self) -> String {
        format!("low_offset_{}", self.name())
    }

    /// Parameter key of the multiplier applied to the sell-side average.
    pub fn high_offset_key(&self) -> String {
        format!("high_offset_{}", self.name())
    }

    pub fn compute(&self, values: &[f64], period: usize) -> Vec<f64> {
        match self {
            MaKind::Sma => sma(values, period),
            MaKind::Ema => ema(values, period),
            MaKind::Trima => trima(values, period),
            MaKind::T3 => t3(values, period, T3_VFACTOR),
            MaKind::Kama => kama(values, period),
        }
    }
}

impl fmt::Display for MaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Moving average of `kind` scaled by `offset`; undefined values stay undefined.
pub fn offset_average(kind: MaKind, values: &[f64], period: usize, offset: f64) -> Vec<f64> {
    kind.compute(values, period)
        .into_iter()
        .map(|v| v * offset)
        .collect()
}

pub fn trima(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return undefined(values.len());
    }
    let (first, second) = if period % 2 == 1 {
        let half = (period + 1) / 2;
        (half, half)
    } else {
        (period / 2, period / 2 + 1)
    };
    sma(&sma(values, first), second)
}

pub fn t3(values: &[f64], period: usize, vfactor: f64) -> Vec<f64> {
    let e1 = ema(values, period);
    let e2 = ema(&e1, period);
    let e3 = ema(&e2, period);
    let e4 = ema(&e3, period);
    let e5 = ema(&e4, period);
    let e6 = ema(&e5, period);

    let v = vfactor;
    let c1 = -v * v * v;
    let c2 = 3.0 * v * v + 3.0 * v * v * v;
    let c3 = -6.0 * v * v - 3.0 * v - 3.0 * v * v * v;
    let c4 = 1.0 + 3.0 * v + v * v * v + 3.0 * v * v;

    (0..values.len())
        .map(|i| c1 * e6[i] + c2 * e5[i] + c3 * e4[i] + c4 * e3[i])
        .collect()
}

pub fn kama(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = undefined(values.len());
    if period == 0 || values.len() <= period || values.iter().any(|v| v.is_nan()) {
        return out;
    }

    let mut prev = values[period - 1];
    for i in period..values.len() {
        let direction = (values[i] - values[i - period]).abs();
        let volatility: f64 = (i + 1 - period..=i)
            .map(|j| (values[j] - values[j - 1]).abs())
            .sum();
        let er = if volatility <= direction || volatility == 0.0 {
            1.0
        } else {
            direction / volatility
        };
        let sc = (er * (KAMA_FAST - KAMA_SLOW) + KAMA_SLOW).powi(2);
        prev += sc * (values[i] - prev);
        out[i] = prev;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::leading_undefined;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn every_kind_matches_declared_lookback() {
        let values = ramp(200);
        for kind in MaKind::ALL {
            let out = kind.compute(&values, 20);
            assert_eq!(leading_undefined(&out), kind.lookback(20), "{}", kind);
        }
    }

    #[test]
    fn every_kind_is_flat_on_flat_input() {
        let values = vec![50.0; 200];
        for kind in MaKind::ALL {
            let out = kind.compute(&values, 10);
            let last = out[out.len() - 1];
            assert!((last - 50.0).abs() < 1e-9, "{} gave {}", kind, last);
        }
    }

    #[test]
    fn trima_odd_period() {
        // n=3: SMA2(SMA2(x))
        let out = trima(&[1.0, 2.0, 3.0, 4.0], 3);
        // SMA2: [_, 1.5, 2.5, 3.5]; SMA2 again: [_, _, 2.0, 3.0]
        assert!(out[1].is_nan());
        assert!((out[2] - 2.0).abs() < 1e-10);
        assert!((out[3] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn trima_even_period_weights_center() {
        let out = trima(&[0.0, 0.0, 6.0, 0.0, 0.0], 4);
        // SMA2 then SMA3: [_, 0, 3, 3, 0] -> index 4 = 2
        assert!((out[4] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn kama_follows_trend_fully_on_clean_trend() {
        // Monotonic input gives efficiency ratio 1, so sc = (2/3)^2.
        let values = ramp(12);
        let out = kama(&values, 10);
        let expected = values[9] + (KAMA_FAST * KAMA_FAST) * (values[10] - values[9]);
        assert!((out[10] - expected).abs() < 1e-10);
    }

    #[test]
    fn offset_average_scales() {
        let values = vec![100.0; 30];
        let out = offset_average(MaKind::Sma, &values, 20, 0.958);
        assert!(out[18].is_nan());
        assert!((out[19] - 95.8).abs() < 1e-9);
    }

    #[test]
    fn offset_keys() {
        assert_eq!(MaKind::T3.low_offset_key(), "low_offset_t3");
        assert_eq!(MaKind::Kama.high_offset_key(), "high_offset_kama");
    }
}
