#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use moho::domain::error::MohoError;
use moho::domain::frame::Frame;
pub use moho::domain::ohlcv::{Candle, Timeframe};
use moho::ports::candle_port::CandlePort;
use std::collections::HashMap;

pub struct MockCandlePort {
    pub data: HashMap<(String, String), Vec<Candle>>,
}

impl MockCandlePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, pair: &str, timeframe: &str, candles: Vec<Candle>) -> Self {
        self.data
            .insert((pair.to_string(), timeframe.to_string()), candles);
        self
    }
}

impl CandlePort for MockCandlePort {
    fn fetch_candles(&self, pair: &str, timeframe: &Timeframe) -> Result<Vec<Candle>, MohoError> {
        self.data
            .get(&(pair.to_string(), timeframe.label().to_string()))
            .cloned()
            .ok_or_else(|| MohoError::Data {
                reason: format!("no candles for {} {}", pair, timeframe),
            })
    }

    fn has_candles(&self, pair: &str, timeframe: &Timeframe) -> bool {
        self.data
            .contains_key(&(pair.to_string(), timeframe.label().to_string()))
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn m5() -> Timeframe {
    Timeframe::parse("5m").unwrap()
}

pub fn h1() -> Timeframe {
    Timeframe::parse("1h").unwrap()
}

pub fn make_candle(timestamp: NaiveDateTime, close: f64, volume: f64) -> Candle {
    Candle {
        timestamp,
        open: close,
        high: close * 1.001,
        low: close * 0.999,
        close,
        volume,
    }
}

/// Candles with the given closes, `step_minutes` apart from `start()`.
pub fn candles_from_closes(closes: &[f64], step_minutes: i64) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(start() + Duration::minutes(step_minutes * i as i64), c, 1000.0))
        .collect()
}

/// Perfectly flat market: every candle identical.
pub fn flat_candles(count: usize, step_minutes: i64, price: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| Candle {
            timestamp: start() + Duration::minutes(step_minutes * i as i64),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1000.0,
        })
        .collect()
}

/// Oscillating market with a slow drift.
pub fn wave_candles(count: usize, step_minutes: i64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + (x * 0.21).sin() * 4.0 + (x * 0.037).cos() * 6.0 + x * 0.002;
            Candle {
                timestamp: start() + Duration::minutes(step_minutes * i as i64),
                open: close - (x * 0.5).sin() * 0.4,
                high: close + 0.6,
                low: close - 0.6,
                close,
                volume: 1000.0 + ((i * 37) % 11) as f64 * 120.0,
            }
        })
        .collect()
}

/// Flat at 100 for `flat` candles, then falling 1% per candle for `drop`.
pub fn crash_candles(flat: usize, drop: usize) -> Vec<Candle> {
    let mut closes = vec![100.0; flat];
    let mut price = 100.0;
    for _ in 0..drop {
        price *= 0.99;
        closes.push(price);
    }
    candles_from_closes(&closes, 5)
}

/// `flat` candles at 100 followed by `rise` candles climbing 1% each (5m).
pub fn pump_candles(flat: usize, rise: usize) -> Vec<Candle> {
    let mut closes = vec![100.0; flat];
    let mut price = 100.0;
    for _ in 0..rise {
        price *= 1.01;
        closes.push(price);
    }
    candles_from_closes(&closes, 5)
}

/// A one-row frame with the given columns.
pub fn single_row(columns: &[(&str, f64)]) -> Frame {
    let mut frame = Frame::with_timestamps(vec![start()]);
    for (name, value) in columns {
        frame.insert(*name, vec![*value]).unwrap();
    }
    frame
}
