//! Column-oriented table of candle-aligned series.
//!
//! A `Frame` holds one timestamp per candle and any number of named `f64`
//! columns of the same length. Undefined values are stored as `NaN`; the
//! `Row` view turns them into `None` so callers never compare against a
//! sentinel.

use crate::domain::error::MohoError;
use crate::domain::ohlcv::Candle;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    timestamps: Vec<NaiveDateTime>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl Frame {
    /// An empty frame over the given timestamps.
    pub fn with_timestamps(timestamps: Vec<NaiveDateTime>) -> Self {
        Self {
            timestamps,
            columns: BTreeMap::new(),
        }
    }

    /// Frame with the raw `open`, `high`, `low`, `close` and `volume` columns.
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut frame = Self::with_timestamps(candles.iter().map(|c| c.timestamp).collect());
        frame
            .columns
            .insert("open".into(), candles.iter().map(|c| c.open).collect());
        frame
            .columns
            .insert("high".into(), candles.iter().map(|c| c.high).collect());
        frame
            .columns
            .insert("low".into(), candles.iter().map(|c| c.low).collect());
        frame
            .columns
            .insert("close".into(), candles.iter().map(|c| c.close).collect());
        frame
            .columns
            .insert("volume".into(), candles.iter().map(|c| c.volume).collect());
        frame
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Add or replace a column. The series must be index-aligned with the frame.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), MohoError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(MohoError::Data {
                reason: format!(
                    "column {} has {} values, frame has {} rows",
                    name,
                    values.len(),
                    self.len()
                ),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Value at `index`, `None` when the column is missing or undefined there.
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.columns
            .get(name)
            .and_then(|col| col.get(index))
            .copied()
            .filter(|v| !v.is_nan())
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.len()).then_some(Row { frame: self, index })
    }

    pub fn last_row(&self) -> Option<Row<'_>> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.len()).map(move |index| Row { frame: self, index })
    }
}

/// Borrowed view of one frame row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    frame: &'a Frame,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.frame.timestamps[self.index]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.frame.value(name, self.index)
    }

    pub fn previous(&self) -> Option<Row<'a>> {
        self.index.checked_sub(1).map(|index| Row {
            frame: self.frame,
            index,
        })
    }

    pub fn frame(&self) -> &'a Frame {
        self.frame
    }
}
