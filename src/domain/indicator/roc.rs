//! Rate-of-change family.
//!
//! ROC(n)[i]  = ((X[i] - X[i-n]) / X[i-n]) * 100
//! ROCP(n)[i] = (X[i] - X[i-n]) / X[i-n]
//! MOM(n)[i]  = X[i] - X[i-n]
//! If X[i-n] == 0 the ratio forms give 0.
//! Warmup: first n values are undefined.
//!
//! TRIX(n) = 1-period ROC of a triple EMA(n). Warmup 3(n-1) + 1.
//!
//! KST = SMA10(ROC10) + 2*SMA10(ROC15) + 3*SMA10(ROC20) + 4*SMA15(ROC30).
//! Warmup 30 + 15 - 1 = 44.

use crate::domain::indicator::ema::ema;
use crate::domain::indicator::{sma, undefined};

pub const KST_LOOKBACK: usize = 44;

fn lagged(values: &[f64], period: usize, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    let mut out = undefined(values.len());
    for i in period..values.len() {
        let (prev, curr) = (values[i - period], values[i]);
        if prev.is_nan() || curr.is_nan() {
            continue;
        }
        out[i] = f(prev, curr);
    }
    out
}

pub fn roc(values: &[f64], period: usize) -> Vec<f64> {
    lagged(values, period, |prev, curr| {
        if prev == 0.0 {
            0.0
        } else {
            (curr - prev) / prev * 100.0
        }
    })
}

pub fn rocp(values: &[f64], period: usize) -> Vec<f64> {
    lagged(values, period, |prev, curr| {
        if prev == 0.0 { 0.0 } else { (curr - prev) / prev }
    })
}

pub fn mom(values: &[f64], period: usize) -> Vec<f64> {
    lagged(values, period, |prev, curr| curr - prev)
}

pub fn trix(values: &[f64], period: usize) -> Vec<f64> {
    let triple = ema(&ema(&ema(values, period), period), period);
    roc(&triple, 1)
}

pub fn kst(values: &[f64]) -> Vec<f64> {
    let legs = [(10, 10, 1.0), (15, 10, 2.0), (20, 10, 3.0), (30, 15, 4.0)];
    let smoothed: Vec<(Vec<f64>, f64)> = legs
        .iter()
        .map(|&(roc_period, sma_period, weight)| (sma(&roc(values, roc_period), sma_period), weight))
        .collect();

    (0..values.len())
        .map(|i| smoothed.iter().map(|(series, w)| series[i] * w).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::leading_undefined;

    #[test]
    fn roc_warmup_and_value() {
        let out = roc(&[100.0, 105.0, 110.0], 2);
        assert!(out[1].is_nan());
        assert!((out[2] - 10.0).abs() < 1e-10);
    }

    #[test]
    fn rocp_is_fraction() {
        let out = rocp(&[50.0, 0.0, 75.0], 2);
        assert!((out[2] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn roc_zero_base_gives_zero() {
        let out = rocp(&[0.0, 5.0], 1);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn mom_difference() {
        let out = mom(&[1.0, 4.0, 9.0, 16.0], 2);
        assert_eq!(out[2], 8.0);
        assert_eq!(out[3], 12.0);
    }

    #[test]
    fn trix_warmup() {
        let values: Vec<f64> = (0..120).map(|i| 50.0 + i as f64).collect();
        assert_eq!(leading_undefined(&trix(&values, 30)), 88);
    }

    #[test]
    fn kst_warmup_and_flat() {
        let flat = vec![10.0; 60];
        let out = kst(&flat);
        assert_eq!(leading_undefined(&out), KST_LOOKBACK);
        assert!(out[59].abs() < 1e-10);
    }
}
