//! Technical indicator implementations.
//!
//! Every indicator returns a `Vec<f64>` index-aligned with its input and
//! left-padded with `NaN` for the warm-up window. Functions that take a
//! `&[f64]` tolerate a `NaN` prefix in their input (so indicators can be
//! chained), and extend the warm-up accordingly.
//!
//! - `IndicatorType`: indicator identity + parameters, with its lookback
//! - shared rolling helpers (`sma`, `rolling_max`, `rolling_min`, `rolling_sum`)

pub mod atr;
pub mod bollinger;
pub mod directional;
pub mod ema;
pub mod ewo;
pub mod hilbert;
pub mod macd;
pub mod moving_average;
pub mod oscillator;
pub mod roc;
pub mod rsi;
pub mod sar;
pub mod stddev;
pub mod stochastic;

pub use moving_average::MaKind;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    MovingAverage {
        kind: MaKind,
        period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Rsi(usize),
    Mfi(usize),
    Directional(usize),
    WillR(usize),
    UltOsc {
        fast: usize,
        mid: usize,
        slow: usize,
    },
    Kst,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Ppo {
        fast: usize,
        slow: usize,
    },
    Apo {
        fast: usize,
        slow: usize,
    },
    Stochastic {
        k_period: usize,
        k_smooth: usize,
        d_period: usize,
    },
    StochRsi {
        rsi_period: usize,
        k_period: usize,
        d_period: usize,
    },
    Fisher,
    Ao,
    Cci(usize),
    Rocp(usize),
    AroonOsc(usize),
    Bop,
    Cmo(usize),
    Mom(usize),
    Rvi(usize),
    Atr(usize),
    Trix(usize),
    HtTrendline,
    HtSine,
    HtPhasor,
    Sar,
    Ewo {
        fast: usize,
        slow: usize,
    },
    VolumeMean(usize),
}

impl IndicatorType {
    /// Number of leading undefined values this indicator produces on a clean input.
    pub fn lookback(&self) -> usize {
        match *self {
            IndicatorType::MovingAverage { kind, period } => kind.lookback(period),
            IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Rsi(p) | IndicatorType::Mfi(p) | IndicatorType::Cmo(p) => p,
            // ADXR is the slowest member of the family.
            IndicatorType::Directional(p) => (3 * p).saturating_sub(2),
            IndicatorType::WillR(p) | IndicatorType::Cci(p) => p.saturating_sub(1),
            IndicatorType::UltOsc { fast, mid, slow } => fast.max(mid).max(slow),
            IndicatorType::Kst => roc::KST_LOOKBACK,
            IndicatorType::Macd { fast, slow, signal } => {
                fast.max(slow).saturating_sub(1) + signal.saturating_sub(1)
            }
            IndicatorType::Ppo { fast, slow } | IndicatorType::Apo { fast, slow } => {
                fast.max(slow).saturating_sub(1)
            }
            IndicatorType::Stochastic {
                k_period,
                k_smooth,
                d_period,
            } => {
                k_period.saturating_sub(1) + k_smooth.saturating_sub(1) + d_period.saturating_sub(1)
            }
            IndicatorType::StochRsi {
                rsi_period,
                k_period,
                d_period,
            } => rsi_period + k_period.saturating_sub(1) + d_period.saturating_sub(1),
            IndicatorType::Fisher | IndicatorType::Bop => 0,
            IndicatorType::Ao => 33,
            IndicatorType::Rocp(p)
            | IndicatorType::AroonOsc(p)
            | IndicatorType::Mom(p)
            | IndicatorType::Atr(p)
            | IndicatorType::VolumeMean(p) => p,
            IndicatorType::Rvi(p) => p + 2,
            IndicatorType::Trix(p) => 3 * p.saturating_sub(1) + 1,
            IndicatorType::HtTrendline | IndicatorType::HtSine => hilbert::TRENDLINE_LOOKBACK,
            IndicatorType::HtPhasor => hilbert::PHASOR_LOOKBACK,
            IndicatorType::Sar => 1,
            IndicatorType::Ewo { fast, slow } => fast.max(slow).saturating_sub(1),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::MovingAverage { kind, period } => {
                write!(f, "{}({})", kind.to_string().to_uppercase(), period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BBANDS({},{})", period, mult)
            }
            IndicatorType::Rsi(p) => write!(f, "RSI({})", p),
            IndicatorType::Mfi(p) => write!(f, "MFI({})", p),
            IndicatorType::Directional(p) => write!(f, "DMI({})", p),
            IndicatorType::WillR(p) => write!(f, "WILLR({})", p),
            IndicatorType::UltOsc { fast, mid, slow } => {
                write!(f, "ULTOSC({},{},{})", fast, mid, slow)
            }
            IndicatorType::Kst => write!(f, "KST"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Ppo { fast, slow } => write!(f, "PPO({},{})", fast, slow),
            IndicatorType::Apo { fast, slow } => write!(f, "APO({},{})", fast, slow),
            IndicatorType::Stochastic {
                k_period,
                k_smooth,
                d_period,
            } => write!(f, "STOCH({},{},{})", k_period, k_smooth, d_period),
            IndicatorType::StochRsi {
                rsi_period,
                k_period,
                d_period,
            } => write!(f, "STOCHRSI({},{},{})", rsi_period, k_period, d_period),
            IndicatorType::Fisher => write!(f, "FISHER"),
            IndicatorType::Ao => write!(f, "AO"),
            IndicatorType::Cci(p) => write!(f, "CCI({})", p),
            IndicatorType::Rocp(p) => write!(f, "ROCP({})", p),
            IndicatorType::AroonOsc(p) => write!(f, "AROONOSC({})", p),
            IndicatorType::Bop => write!(f, "BOP"),
            IndicatorType::Cmo(p) => write!(f, "CMO({})", p),
            IndicatorType::Mom(p) => write!(f, "MOM({})", p),
            IndicatorType::Rvi(p) => write!(f, "RVI({})", p),
            IndicatorType::Atr(p) => write!(f, "ATR({})", p),
            IndicatorType::Trix(p) => write!(f, "TRIX({})", p),
            IndicatorType::HtTrendline => write!(f, "HT_TRENDLINE"),
            IndicatorType::HtSine => write!(f, "HT_SINE"),
            IndicatorType::HtPhasor => write!(f, "HT_PHASOR"),
            IndicatorType::Sar => write!(f, "SAR"),
            IndicatorType::Ewo { fast, slow } => write!(f, "EWO({},{})", fast, slow),
            IndicatorType::VolumeMean(p) => write!(f, "VOLUME_MEAN({})", p),
        }
    }
}

/// All-`NaN` series of the given length.
pub fn undefined(len: usize) -> Vec<f64> {
    vec![f64::NAN; len]
}

/// Simple moving average. A window containing any `NaN` is undefined.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = undefined(values.len());
    if period == 0 {
        return out;
    }
    let mut sum = 0.0;
    let mut run = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            sum = 0.0;
            run = 0;
            continue;
        }
        sum += v;
        run += 1;
        if run > period {
            sum -= values[i - period];
            run = period;
        }
        if run == period {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Rolling sum over `period` values; undefined while the window holds a `NaN`.
pub fn rolling_sum(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().sum())
}

/// Highest value of the trailing window.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().copied().fold(f64::MIN, f64::max))
}

/// Lowest value of the trailing window.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().copied().fold(f64::MAX, f64::min))
}

fn rolling(values: &[f64], period: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = undefined(values.len());
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = f(window);
    }
    out
}

/// Index of the first non-`NaN` value.
pub fn first_defined(values: &[f64]) -> Option<usize> {
    values.iter().position(|v| !v.is_nan())
}

/// Number of leading `NaN` values, i.e. the observed warm-up of a series.
pub fn leading_undefined(values: &[f64]) -> usize {
    first_defined(values).unwrap_or(values.len())
}
