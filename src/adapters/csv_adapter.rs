//! CSV file candle adapter.
//!
//! One file per pair and timeframe, named `<pair>_<timeframe>.csv` with `/`
//! in the pair replaced by `_` (e.g. `BTC_USDT_5m.csv`). Columns are
//! `timestamp,open,high,low,close,volume`, timestamps in UTC.

use crate::domain::error::MohoError;
use crate::domain::ohlcv::{Candle, Timeframe};
use crate::ports::candle_port::CandlePort;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, pair: &str, timeframe: &Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", pair.replace('/', "_"), timeframe))
    }

    /// Read every candle of one CSV file, sorted by timestamp.
    pub fn read_file(path: &Path) -> Result<Vec<Candle>, MohoError> {
        let content = fs::read_to_string(path).map_err(|e| MohoError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let candles = parse_candles(&content)?;
        debug!(path = %path.display(), candles = candles.len(), "loaded candles");
        Ok(candles)
    }
}

impl CandlePort for CsvAdapter {
    fn fetch_candles(&self, pair: &str, timeframe: &Timeframe) -> Result<Vec<Candle>, MohoError> {
        Self::read_file(&self.csv_path(pair, timeframe))
    }

    fn has_candles(&self, pair: &str, timeframe: &Timeframe) -> bool {
        self.csv_path(pair, timeframe).is_file()
    }
}

/// Parse CSV text with a header row into candles, sorted by timestamp.
pub fn parse_candles(content: &str) -> Result<Vec<Candle>, MohoError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut candles = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| MohoError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        // header is line 1
        let line = line + 2;

        let ts_str = record.get(0).ok_or_else(|| MohoError::Data {
            reason: format!("line {}: missing timestamp column", line),
        })?;
        let timestamp = parse_timestamp(ts_str.trim()).ok_or_else(|| MohoError::Data {
            reason: format!(
                "line {}: invalid timestamp '{}', expected {}",
                line, ts_str, TIMESTAMP_FORMAT
            ),
        })?;

        candles.push(Candle {
            timestamp,
            open: field(&record, 1, "open", line)?,
            high: field(&record, 2, "high", line)?,
            low: field(&record, 3, "low", line)?,
            close: field(&record, 4, "close", line)?,
            volume: field(&record, 5, "volume", line)?,
        });
    }

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn field(record: &csv::StringRecord, index: usize, name: &str, line: usize) -> Result<f64, MohoError> {
    let raw = record.get(index).ok_or_else(|| MohoError::Data {
        reason: format!("line {}: missing {} column", line, name),
    })?;
    let value: f64 = raw.trim().parse().map_err(|e| MohoError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })?;
    if !value.is_finite() {
        return Err(MohoError::Data {
            reason: format!("line {}: {} is not finite", line, name),
        });
    }
    Ok(value)
}
