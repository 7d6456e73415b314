//! Static strategy settings: timeframes, startup window, ROI table, stops.

use crate::domain::ohlcv::Timeframe;
use crate::domain::position::{OpenPosition, TradeSide};
use std::fmt;

/// Minimum profit ratio to exit at, keyed by trade age in minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiTable {
    /// Ascending by minute.
    entries: Vec<(i64, f64)>,
}

impl RoiTable {
    pub fn new(mut entries: Vec<(i64, f64)>) -> Self {
        entries.sort_by_key(|(minute, _)| *minute);
        entries.dedup_by_key(|(minute, _)| *minute);
        Self { entries }
    }

    /// Parse `minute:ratio` pairs separated by commas, e.g. `0:0.08, 10:0.04`.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (minute, ratio) = part
                .split_once(':')
                .ok_or_else(|| format!("expected minute:ratio, found '{}'", part))?;
            let minute: i64 = minute
                .trim()
                .parse()
                .map_err(|_| format!("invalid minute '{}'", minute.trim()))?;
            let ratio: f64 = ratio
                .trim()
                .parse()
                .map_err(|_| format!("invalid ratio '{}'", ratio.trim()))?;
            if minute < 0 || !ratio.is_finite() {
                return Err(format!("invalid entry '{}'", part));
            }
            if entries.iter().any(|(m, _)| *m == minute) {
                return Err(format!("duplicate minute {}", minute));
            }
            entries.push((minute, ratio));
        }
        if entries.is_empty() {
            return Err("ROI table is empty".to_string());
        }
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[(i64, f64)] {
        &self.entries
    }

    /// ROI threshold in force after `trade_minutes`.
    pub fn threshold(&self, trade_minutes: i64) -> Option<f64> {
        self.entries
            .iter()
            .rev()
            .find(|(minute, _)| *minute <= trade_minutes)
            .map(|(_, ratio)| *ratio)
    }
}

impl Default for RoiTable {
    fn default() -> Self {
        Self::new(vec![(0, 0.08), (10, 0.04), (30, 0.02), (60, 0.01)])
    }
}

impl fmt::Display for RoiTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (minute, ratio)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", minute, ratio)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    pub timeframe: Timeframe,
    pub informative_timeframe: Timeframe,
    pub startup_candle_count: usize,
    /// Fixed stop as a (negative) profit ratio.
    pub stoploss: f64,
    pub minimal_roi: RoiTable,
    pub trailing_stop: bool,
    pub trailing_only_offset_is_reached: bool,
    pub trailing_stop_positive: f64,
    pub trailing_stop_positive_offset: f64,
    pub use_custom_stoploss: bool,
    pub use_exit_signal: bool,
    pub exit_profit_only: bool,
    pub ignore_roi_if_entry_signal: bool,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::from_minutes(5),
            informative_timeframe: Timeframe::from_hours(1),
            startup_candle_count: 300,
            stoploss: -0.15,
            minimal_roi: RoiTable::default(),
            trailing_stop: true,
            trailing_only_offset_is_reached: true,
            trailing_stop_positive: 0.01,
            trailing_stop_positive_offset: 0.04,
            use_custom_stoploss: false,
            use_exit_signal: true,
            exit_profit_only: false,
            ignore_roi_if_entry_signal: true,
        }
    }
}

impl StrategySettings {
    /// True once `profit` meets the ROI threshold for a trade of this age.
    pub fn minimal_roi_reached(&self, trade_minutes: i64, profit: f64) -> bool {
        self.minimal_roi
            .threshold(trade_minutes)
            .is_some_and(|roi| profit >= roi)
    }

    /// Rate of the fixed stop relative to the entry.
    pub fn stoploss_rate(&self, position: &OpenPosition) -> f64 {
        match position.side {
            TradeSide::Long => position.entry_rate * (1.0 + self.stoploss),
            TradeSide::Short => position.entry_rate * (1.0 - self.stoploss),
        }
    }

    /// Trailing stop rate, once the trailing offset has been reached.
    pub fn trailing_stop_rate(&self, position: &OpenPosition) -> Option<f64> {
        if !self.trailing_stop {
            return None;
        }
        if self.trailing_only_offset_is_reached
            && position.max_profit() < self.trailing_stop_positive_offset
        {
            return None;
        }
        Some(match position.side {
            TradeSide::Long => position.best_rate * (1.0 - self.trailing_stop_positive),
            TradeSide::Short => position.best_rate * (1.0 + self.trailing_stop_positive),
        })
    }

    /// The tighter of the fixed and trailing stops.
    pub fn effective_stop_rate(&self, position: &OpenPosition) -> f64 {
        let fixed = self.stoploss_rate(position);
        match (self.trailing_stop_rate(position), position.side) {
            (Some(trail), TradeSide::Long) => trail.max(fixed),
            (Some(trail), TradeSide::Short) => trail.min(fixed),
            (None, _) => fixed,
        }
    }

    /// Whether an exit signal may close the trade at `profit`.
    pub fn exit_signal_allowed(&self, profit: f64) -> bool {
        self.use_exit_signal && (!self.exit_profit_only || profit > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn position(side: TradeSide, best: f64, current: f64) -> OpenPosition {
        let t = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        OpenPosition {
            pair: "SOL/USDT".into(),
            side,
            entry_rate: 100.0,
            entry_time: t,
            best_rate: best,
            current_rate: current,
            current_time: t + Duration::minutes(20),
            reported_profit: None,
        }
    }

    #[test]
    fn default_roi_table() {
        let s = StrategySettings::default();
        assert_eq!(s.minimal_roi.entries(), &[(0, 0.08), (10, 0.04), (30, 0.02), (60, 0.01)]);
        assert_eq!(s.timeframe.label(), "5m");
        assert_eq!(s.informative_timeframe.label(), "1h");
        assert_eq!(s.startup_candle_count, 300);
    }

    #[test]
    fn roi_threshold_steps_down_with_age() {
        let s = StrategySettings::default();
        assert!(!s.minimal_roi_reached(5, 0.05));
        assert!(s.minimal_roi_reached(5, 0.08));
        assert!(s.minimal_roi_reached(10, 0.04));
        assert!(!s.minimal_roi_reached(29, 0.03));
        assert!(s.minimal_roi_reached(45, 0.02));
        assert!(s.minimal_roi_reached(600, 0.01));
        assert!(!s.minimal_roi_reached(-1, 1.0));
    }

    #[test]
    fn roi_parse() {
        let table = RoiTable::parse("30:0.02, 0:0.08").unwrap();
        assert_eq!(table.entries(), &[(0, 0.08), (30, 0.02)]);
        assert_eq!(table.to_string(), "0:0.08,30:0.02");
        assert!(RoiTable::parse("").is_err());
        assert!(RoiTable::parse("0=0.08").is_err());
        assert!(RoiTable::parse("0:abc").is_err());
        assert!(RoiTable::parse("0:0.1,0:0.2").is_err());
        assert!(RoiTable::parse("-5:0.1").is_err());
    }

    #[test]
    fn trailing_stop_waits_for_offset() {
        let s = StrategySettings::default();
        assert_eq!(s.trailing_stop_rate(&position(TradeSide::Long, 103.0, 102.0)), None);
        let rate = s
            .trailing_stop_rate(&position(TradeSide::Long, 110.0, 108.0))
            .unwrap();
        assert!((rate - 108.9).abs() < 1e-9);
    }

    #[test]
    fn trailing_stop_short() {
        let s = StrategySettings::default();
        let rate = s
            .trailing_stop_rate(&position(TradeSide::Short, 90.0, 91.0))
            .unwrap();
        assert!((rate - 90.9).abs() < 1e-9);
    }

    #[test]
    fn effective_stop_takes_the_tighter_rate() {
        let s = StrategySettings::default();
        let pos = position(TradeSide::Long, 103.0, 102.0);
        assert!((s.effective_stop_rate(&pos) - 85.0).abs() < 1e-9);
        let pos = position(TradeSide::Long, 110.0, 108.0);
        assert!((s.effective_stop_rate(&pos) - 108.9).abs() < 1e-9);
        let pos = position(TradeSide::Short, 100.0, 100.0);
        assert!((s.effective_stop_rate(&pos) - 115.0).abs() < 1e-9);
    }

    #[test]
    fn exit_signal_gate() {
        let mut s = StrategySettings::default();
        assert!(s.exit_signal_allowed(-0.01));
        s.exit_profit_only = true;
        assert!(!s.exit_signal_allowed(-0.01));
        assert!(s.exit_signal_allowed(0.01));
        s.use_exit_signal = false;
        assert!(!s.exit_signal_allowed(0.01));
    }
}
