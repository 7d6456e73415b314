//! Bounded and unbounded price/volume oscillators computed from full candles.
//!
//! - WILLR(n) = -100 * (HH(n) - C) / (HH(n) - LL(n)). Warmup n-1.
//! - ULTOSC(a,b,c): buying pressure C - min(L, C[i-1]) over true range,
//!   summed over three windows and weighted 4:2:1. Warmup max(a,b,c).
//! - CCI(n) = (TP - SMA(TP)) / (0.015 * mean deviation). Warmup n-1.
//! - AROONOSC(n) = 100 * (idx(HH) - idx(LL)) / n over n+1 bars. Warmup n.
//! - BOP = (C - O) / (H - L). Warmup 0.
//! - AO = SMA5(median) - SMA34(median). Warmup 33.
//! - RVI(n) = SMA(sym-weighted C - O) / SMA(sym-weighted H - L),
//!   weights 1,2,2,1 over the last four bars. Warmup n+2.
//! - MFI(n) = 100 * positive flow / total flow of TP * V. Warmup n.
//!
//! Zero denominators give 0 rather than an undefined value.

use crate::domain::indicator::{rolling_max, rolling_min, sma, undefined};
use crate::domain::ohlcv::Candle;

fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

pub fn willr(candles: &[Candle], period: usize) -> Vec<f64> {
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let hh = rolling_max(&highs, period);
    let ll = rolling_min(&lows, period);
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if hh[i].is_nan() {
                f64::NAN
            } else {
                -100.0 * ratio_or_zero(hh[i] - c.close, hh[i] - ll[i])
            }
        })
        .collect()
}

pub fn ultosc(candles: &[Candle], fast: usize, mid: usize, slow: usize) -> Vec<f64> {
    let n = candles.len();
    let mut out = undefined(n);
    let longest = fast.max(mid).max(slow);
    if fast == 0 || mid == 0 || slow == 0 || n <= longest {
        return out;
    }

    let mut bp = vec![0.0; n];
    let mut tr = vec![0.0; n];
    for i in 1..n {
        let prev_close = candles[i - 1].close;
        let true_low = candles[i].low.min(prev_close);
        bp[i] = candles[i].close - true_low;
        tr[i] = candles[i].high.max(prev_close) - true_low;
    }

    let average = |i: usize, window: usize| {
        let range = i + 1 - window..=i;
        ratio_or_zero(bp[range.clone()].iter().sum(), tr[range].iter().sum())
    };
    for i in longest..n {
        let weighted = 4.0 * average(i, fast) + 2.0 * average(i, mid) + average(i, slow);
        out[i] = 100.0 * weighted / 7.0;
    }
    out
}

pub fn cci(candles: &[Candle], period: usize) -> Vec<f64> {
    let tp: Vec<f64> = candles.iter().map(Candle::typical_price).collect();
    let mean = sma(&tp, period);
    let mut out = undefined(candles.len());
    for i in 0..candles.len() {
        if mean[i].is_nan() {
            continue;
        }
        let window = &tp[i + 1 - period..=i];
        let deviation = window.iter().map(|v| (v - mean[i]).abs()).sum::<f64>() / period as f64;
        out[i] = ratio_or_zero(tp[i] - mean[i], 0.015 * deviation);
    }
    out
}

pub fn aroonosc(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = undefined(candles.len());
    if period == 0 {
        return out;
    }
    for i in period..candles.len() {
        let start = i - period;
        let mut hh_idx = start;
        let mut ll_idx = start;
        for j in start..=i {
            if candles[j].high >= candles[hh_idx].high {
                hh_idx = j;
            }
            if candles[j].low <= candles[ll_idx].low {
                ll_idx = j;
            }
        }
        out[i] = 100.0 * (hh_idx as f64 - ll_idx as f64) / period as f64;
    }
    out
}

pub fn bop(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .map(|c| ratio_or_zero(c.close - c.open, c.high - c.low))
        .collect()
}

pub fn ao(candles: &[Candle]) -> Vec<f64> {
    let median: Vec<f64> = candles.iter().map(Candle::median_price).collect();
    let fast = sma(&median, 5);
    let slow = sma(&median, 34);
    fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
}

pub fn rvi(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut num = undefined(n);
    let mut den = undefined(n);
    for i in 3..n {
        let sym = |f: fn(&Candle) -> f64| {
            (f(&candles[i]) + 2.0 * f(&candles[i - 1]) + 2.0 * f(&candles[i - 2]) + f(&candles[i - 3]))
                / 6.0
        };
        num[i] = sym(|c| c.close - c.open);
        den[i] = sym(|c| c.high - c.low);
    }
    let num = sma(&num, period);
    let den = sma(&den, period);
    num.iter()
        .zip(&den)
        .map(|(a, b)| {
            if a.is_nan() || b.is_nan() {
                f64::NAN
            } else {
                ratio_or_zero(*a, *b)
            }
        })
        .collect()
}

pub fn mfi(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut out = undefined(n);
    if period == 0 || n <= period {
        return out;
    }

    let mut positive = vec![0.0; n];
    let mut negative = vec![0.0; n];
    for i in 1..n {
        let tp = candles[i].typical_price();
        let prev = candles[i - 1].typical_price();
        let flow = tp * candles[i].volume;
        if tp > prev {
            positive[i] = flow;
        } else if tp < prev {
            negative[i] = flow;
        }
    }

    for i in period..n {
        let range = i + 1 - period..=i;
        let pos: f64 = positive[range.clone()].iter().sum();
        let neg: f64 = negative[range].iter().sum();
        out[i] = 100.0 * ratio_or_zero(pos, pos + neg);
    }
    out
}
