//! The fixed indicator catalog for both timeframes.
//!
//! `primary_catalog` / `informative_catalog` list what gets computed (and so
//! how much history is needed); `compute_primary` / `compute_informative`
//! produce the frames with one named column per output.

use crate::domain::error::MohoError;
use crate::domain::frame::Frame;
use crate::domain::indicator::atr::atr;
use crate::domain::indicator::bollinger::bollinger;
use crate::domain::indicator::directional::directional;
use crate::domain::indicator::ewo::{ewo, volume_mean};
use crate::domain::indicator::hilbert::hilbert;
use crate::domain::indicator::macd::{apo, macd, ppo};
use crate::domain::indicator::moving_average::offset_average;
use crate::domain::indicator::oscillator::{ao, aroonosc, bop, cci, mfi, rvi, ultosc, willr};
use crate::domain::indicator::roc::{kst, mom, rocp, trix};
use crate::domain::indicator::rsi::{cmo, rsi};
use crate::domain::indicator::sar::{DEFAULT_ACCELERATION, DEFAULT_MAXIMUM, sar};
use crate::domain::indicator::stochastic::{fisher, stoch, stochrsi};
use crate::domain::indicator::{IndicatorType, MaKind};
use crate::domain::ohlcv::{Candle, Timeframe};
use crate::domain::params::ParameterBundle;
use tracing::debug;

pub const RSI_PERIOD: usize = 14;
pub const RSI_FAST_PERIOD: usize = 4;
pub const RSI_SLOW_PERIOD: usize = 50;
pub const VOLUME_MEAN_PERIOD: usize = 4;

/// Column names produced by `compute_primary`, raw OHLCV included.
pub const PRIMARY_COLUMNS: &[&str] = &[
    "open",
    "high",
    "low",
    "close",
    "volume",
    "sma_offset_buy",
    "sma_offset_sell",
    "ema_offset_buy",
    "ema_offset_sell",
    "trima_offset_buy",
    "trima_offset_sell",
    "t3_offset_buy",
    "t3_offset_sell",
    "kama_offset_buy",
    "kama_offset_sell",
    "bb_upperband",
    "bb_middleband",
    "bb_lowerband",
    "bbpercent",
    "bb_width",
    "rsi",
    "rsi_fast",
    "rsi_slow",
    "mfi",
    "plus_dm",
    "minus_dm",
    "plus_di",
    "minus_di",
    "dx",
    "adx",
    "adxr",
    "willr",
    "ultosc",
    "kst",
    "macd",
    "macdsignal",
    "macdhist",
    "ppo",
    "apo",
    "slowk",
    "slowd",
    "fastk",
    "fastd",
    "fisher",
    "ao",
    "cci",
    "rocp",
    "aroonosc",
    "bop",
    "cmo",
    "mom",
    "rvi",
    "atr",
    "trix",
    "ht_trendline",
    "ht_sine",
    "ht_leadsine",
    "ht_phasor_inphase",
    "ht_phasor_quadrature",
    "sar",
    "ewo",
    "volume_mean_4",
];

/// Column names produced by `compute_informative`, before suffixing.
pub const INFORMATIVE_COLUMNS: &[&str] = &["open", "high", "low", "close", "volume", "rsi"];

pub fn primary_catalog(params: &ParameterBundle) -> Result<Vec<IndicatorType>, MohoError> {
    let buy_period = params.period("base_nb_candles_buy")?;
    let sell_period = params.period("base_nb_candles_sell")?;

    let mut catalog = Vec::new();
    for kind in MaKind::ALL {
        catalog.push(IndicatorType::MovingAverage {
            kind,
            period: buy_period,
        });
        catalog.push(IndicatorType::MovingAverage {
            kind,
            period: sell_period,
        });
    }
    catalog.extend([
        IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        },
        IndicatorType::Rsi(RSI_PERIOD),
        IndicatorType::Rsi(RSI_FAST_PERIOD),
        IndicatorType::Rsi(RSI_SLOW_PERIOD),
        IndicatorType::Mfi(14),
        IndicatorType::Directional(14),
        IndicatorType::WillR(14),
        IndicatorType::UltOsc {
            fast: 7,
            mid: 14,
            slow: 28,
        },
        IndicatorType::Kst,
        IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        },
        IndicatorType::Ppo { fast: 12, slow: 26 },
        IndicatorType::Apo { fast: 12, slow: 26 },
        IndicatorType::Stochastic {
            k_period: 5,
            k_smooth: 3,
            d_period: 3,
        },
        IndicatorType::StochRsi {
            rsi_period: 14,
            k_period: 5,
            d_period: 3,
        },
        IndicatorType::Fisher,
        IndicatorType::Ao,
        IndicatorType::Cci(14),
        IndicatorType::Rocp(14),
        IndicatorType::AroonOsc(14),
        IndicatorType::Bop,
        IndicatorType::Cmo(14),
        IndicatorType::Mom(10),
        IndicatorType::Rvi(10),
        IndicatorType::Atr(14),
        IndicatorType::Trix(30),
        IndicatorType::HtTrendline,
        IndicatorType::HtSine,
        IndicatorType::HtPhasor,
        IndicatorType::Sar,
        IndicatorType::Ewo {
            fast: params.period("fast_ewo")?,
            slow: params.period("slow_ewo")?,
        },
        IndicatorType::VolumeMean(VOLUME_MEAN_PERIOD),
    ]);
    Ok(catalog)
}

pub fn informative_catalog() -> Vec<IndicatorType> {
    vec![IndicatorType::Rsi(RSI_PERIOD)]
}

/// Candles needed so that every catalog entry has at least one defined value.
pub fn required_history(catalog: &[IndicatorType]) -> usize {
    catalog.iter().map(IndicatorType::lookback).max().unwrap_or(0) + 1
}

fn check_history(
    candles: &[Candle],
    timeframe: &Timeframe,
    catalog: &[IndicatorType],
) -> Result<(), MohoError> {
    let need = required_history(catalog);
    if candles.len() < need {
        return Err(MohoError::InsufficientHistory {
            timeframe: timeframe.label().to_string(),
            have: candles.len(),
            need,
        });
    }
    Ok(())
}

pub fn compute_primary(
    candles: &[Candle],
    timeframe: &Timeframe,
    params: &ParameterBundle,
) -> Result<Frame, MohoError> {
    let catalog = primary_catalog(params)?;
    check_history(candles, timeframe, &catalog)?;

    let mut frame = Frame::from_candles(candles);
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volume: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    let buy_period = params.period("base_nb_candles_buy")?;
    let sell_period = params.period("base_nb_candles_sell")?;
    for kind in MaKind::ALL {
        let low = params.decimal(&kind.low_offset_key())?;
        let high = params.decimal(&kind.high_offset_key())?;
        frame.insert(
            format!("{}_offset_buy", kind),
            offset_average(kind, &close, buy_period, low),
        )?;
        frame.insert(
            format!("{}_offset_sell", kind),
            offset_average(kind, &close, sell_period, high),
        )?;
    }

    let bands = bollinger(&close, 20, 200);
    frame.insert("bb_upperband", bands.upper)?;
    frame.insert("bb_middleband", bands.middle)?;
    frame.insert("bb_lowerband", bands.lower)?;
    frame.insert("bbpercent", bands.percent)?;
    frame.insert("bb_width", bands.width)?;

    frame.insert("rsi", rsi(&close, RSI_PERIOD))?;
    frame.insert("rsi_fast", rsi(&close, RSI_FAST_PERIOD))?;
    frame.insert("rsi_slow", rsi(&close, RSI_SLOW_PERIOD))?;
    frame.insert("mfi", mfi(candles, 14))?;

    let dm = directional(candles, 14);
    frame.insert("plus_dm", dm.plus_dm)?;
    frame.insert("minus_dm", dm.minus_dm)?;
    frame.insert("plus_di", dm.plus_di)?;
    frame.insert("minus_di", dm.minus_di)?;
    frame.insert("dx", dm.dx)?;
    frame.insert("adx", dm.adx)?;
    frame.insert("adxr", dm.adxr)?;

    frame.insert("willr", willr(candles, 14))?;
    frame.insert("ultosc", ultosc(candles, 7, 14, 28))?;
    frame.insert("kst", kst(&close))?;

    let m = macd(&close, 12, 26, 9);
    frame.insert("macd", m.line)?;
    frame.insert("macdsignal", m.signal)?;
    frame.insert("macdhist", m.histogram)?;
    frame.insert("ppo", ppo(&close, 12, 26))?;
    frame.insert("apo", apo(&close, 12, 26))?;

    let slow = stoch(candles, 5, 3, 3);
    frame.insert("slowk", slow.k)?;
    frame.insert("slowd", slow.d)?;
    let fast = stochrsi(&close, 14, 5, 3);
    frame.insert("fisher", fisher(&fast.k))?;
    frame.insert("fastk", fast.k)?;
    frame.insert("fastd", fast.d)?;

    frame.insert("ao", ao(candles))?;
    frame.insert("cci", cci(candles, 14))?;
    frame.insert("rocp", rocp(&close, 14))?;
    frame.insert("aroonosc", aroonosc(candles, 14))?;
    frame.insert("bop", bop(candles))?;
    frame.insert("cmo", cmo(&close, 14))?;
    frame.insert("mom", mom(&close, 10))?;
    frame.insert("rvi", rvi(candles, 10))?;
    frame.insert("atr", atr(candles, 14))?;
    frame.insert("trix", trix(&close, 30))?;

    let ht = hilbert(&close);
    frame.insert("ht_trendline", ht.trendline)?;
    frame.insert("ht_sine", ht.sine)?;
    frame.insert("ht_leadsine", ht.leadsine)?;
    frame.insert("ht_phasor_inphase", ht.inphase)?;
    frame.insert("ht_phasor_quadrature", ht.quadrature)?;

    frame.insert("sar", sar(candles, DEFAULT_ACCELERATION, DEFAULT_MAXIMUM))?;
    frame.insert(
        "ewo",
        ewo(&close, params.period("fast_ewo")?, params.period("slow_ewo")?),
    )?;
    frame.insert("volume_mean_4", volume_mean(&volume, VOLUME_MEAN_PERIOD))?;

    debug!(
        timeframe = %timeframe,
        rows = frame.len(),
        columns = frame.column_names().count(),
        "computed primary indicators"
    );
    Ok(frame)
}

pub fn compute_informative(candles: &[Candle], timeframe: &Timeframe) -> Result<Frame, MohoError> {
    check_history(candles, timeframe, &informative_catalog())?;

    let mut frame = Frame::from_candles(candles);
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    frame.insert("rsi", rsi(&close, RSI_PERIOD))?;

    debug!(timeframe = %timeframe, rows = frame.len(), "computed informative indicators");
    Ok(frame)
}

/// Every column the pipeline exposes once the informative frame is merged
/// with `suffix`.
pub fn merged_columns(suffix: &str) -> Vec<String> {
    PRIMARY_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(INFORMATIVE_COLUMNS.iter().map(|c| format!("{}_{}", c, suffix)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::leading_undefined;
    use chrono::{Duration, NaiveDate};

    fn candles(n: usize) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| {
                let mid = 100.0 + (i as f64 * 0.2).sin() * 3.0 + i as f64 * 0.01;
                Candle {
                    timestamp: start + Duration::minutes(5 * i as i64),
                    open: mid - 0.2,
                    high: mid + 1.0,
                    low: mid - 1.0,
                    close: mid + 0.1,
                    volume: 1000.0 + (i % 7) as f64 * 10.0,
                }
            })
            .collect()
    }

    fn m5() -> Timeframe {
        Timeframe::parse("5m").unwrap()
    }

    #[test]
    fn default_primary_needs_ewo_history() {
        let catalog = primary_catalog(&ParameterBundle::defaults()).unwrap();
        assert_eq!(required_history(&catalog), 200);
    }

    #[test]
    fn short_primary_is_insufficient_history() {
        let err = compute_primary(&candles(150), &m5(), &ParameterBundle::defaults()).unwrap_err();
        assert!(matches!(
            err,
            MohoError::InsufficientHistory {
                have: 150,
                need: 200,
                ..
            }
        ));
    }

    #[test]
    fn primary_frame_has_every_declared_column() {
        let frame = compute_primary(&candles(300), &m5(), &ParameterBundle::defaults()).unwrap();
        let mut produced: Vec<&str> = frame.column_names().collect();
        let mut declared: Vec<&str> = PRIMARY_COLUMNS.to_vec();
        produced.sort();
        declared.sort();
        assert_eq!(produced, declared);
    }

    #[test]
    fn primary_warmups_match_catalog_lookbacks() {
        let frame = compute_primary(&candles(300), &m5(), &ParameterBundle::defaults()).unwrap();
        let col = |name: &str| leading_undefined(frame.column(name).unwrap());
        assert_eq!(col("rsi"), 14);
        assert_eq!(col("rsi_slow"), 50);
        assert_eq!(col("sma_offset_buy"), 19);
        assert_eq!(col("t3_offset_buy"), 114);
        assert_eq!(col("kama_offset_buy"), 20);
        assert_eq!(col("adxr"), 40);
        assert_eq!(col("ewo"), 199);
        assert_eq!(col("fisher"), 0);
        assert_eq!(col("volume_mean_4"), 4);
        assert_eq!(col("ht_trendline"), 63);
    }

    #[test]
    fn offsets_scale_the_average() {
        let params = ParameterBundle::from_overrides([("low_offset_sma", "0.95")]).unwrap();
        let frame = compute_primary(&candles(300), &m5(), &params).unwrap();
        let close = frame.column("close").unwrap();
        let mean = close[280..300].iter().sum::<f64>() / 20.0;
        let got = frame.value("sma_offset_buy", 299).unwrap();
        assert!((got - mean * 0.95).abs() < 1e-9);
    }

    #[test]
    fn informative_needs_rsi_history() {
        let h1 = Timeframe::parse("1h").unwrap();
        assert!(compute_informative(&candles(14), &h1).is_err());
        let frame = compute_informative(&candles(15), &h1).unwrap();
        assert!(frame.value("rsi", 14).is_some());
        assert!(frame.value("rsi", 13).is_none());
    }

    #[test]
    fn merged_columns_suffix_informative() {
        let cols = merged_columns("1h");
        assert!(cols.contains(&"rsi_1h".to_string()));
        assert!(cols.contains(&"close_1h".to_string()));
        assert!(cols.contains(&"ewo".to_string()));
    }
}
