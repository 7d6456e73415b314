//! Snapshot of an open trade, owned by the host.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "long" => Some(TradeSide::Long),
            "short" => Some(TradeSide::Short),
            _ => None,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "long"),
            TradeSide::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub pair: String,
    pub side: TradeSide,
    pub entry_rate: f64,
    pub entry_time: NaiveDateTime,
    /// Most favourable rate seen since entry: highest for longs, lowest for shorts.
    pub best_rate: f64,
    pub current_rate: f64,
    pub current_time: NaiveDateTime,
    /// Profit ratio as the host computes it (fees included). Overrides the
    /// rate-derived ratio when present.
    pub reported_profit: Option<f64>,
}

impl OpenPosition {
    /// Profit ratio of closing at `rate`, fees excluded.
    pub fn profit_at(&self, rate: f64) -> f64 {
        if self.entry_rate == 0.0 {
            return 0.0;
        }
        match self.side {
            TradeSide::Long => rate / self.entry_rate - 1.0,
            TradeSide::Short => 1.0 - rate / self.entry_rate,
        }
    }

    pub fn current_profit(&self) -> f64 {
        self.reported_profit
            .unwrap_or_else(|| self.profit_at(self.current_rate))
    }

    /// Best profit ratio reached so far; never below the current profit.
    pub fn max_profit(&self) -> f64 {
        self.profit_at(self.best_rate).max(self.current_profit())
    }

    pub fn trade_minutes(&self) -> i64 {
        (self.current_time - self.entry_time).num_minutes()
    }
}
