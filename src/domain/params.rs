//! Tunable strategy parameters.
//!
//! Every threshold the rule groups and the exit policy read is declared once
//! in a fixed table of `ParamSpec` entries, addressed by a stable string key.
//! A `ParameterBundle` is built from that table (defaults, optionally
//! overridden from configuration), validated once, and then passed around by
//! reference; it is never mutated during evaluation.

use crate::domain::error::MohoError;
use crate::domain::indicator::MaKind;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

pub const ENTRY_GROUP_COUNT: u8 = 21;
pub const EXIT_GROUP_COUNT: u8 = 8;

/// Which optimizer space a parameter belongs to; also its INI section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Space {
    Buy,
    Sell,
}

impl Space {
    pub fn section(&self) -> &'static str {
        match self {
            Space::Buy => "buy",
            Space::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Decimal(f64),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Decimal(_) => "decimal",
            ParamValue::Int(_) => "int",
            ParamValue::Bool(_) => "bool",
        }
    }

    /// Numeric view; booleans read as 1.0 / 0.0.
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParamValue::Decimal(v) => v,
            ParamValue::Int(v) => v as f64,
            ParamValue::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Decimal(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub key: String,
    pub space: Space,
    pub default: ParamValue,
    /// Optimizer search range. Booleans carry (0, 1).
    pub min: f64,
    pub max: f64,
    /// Accepted so full hyperopt parameter files load, but read only when a
    /// configured rule expression references it.
    pub extended: bool,
}

impl ParamSpec {
    fn decimal(key: &str, space: Space, default: f64, min: f64, max: f64) -> Self {
        Self {
            key: key.to_string(),
            space,
            default: ParamValue::Decimal(default),
            min,
            max,
            extended: false,
        }
    }

    fn extended(key: &str, space: Space, default: f64, min: f64, max: f64) -> Self {
        Self {
            extended: true,
            ..Self::decimal(key, space, default, min, max)
        }
    }

    fn int(key: &str, space: Space, default: i64, min: i64, max: i64) -> Self {
        Self {
            key: key.to_string(),
            space,
            default: ParamValue::Int(default),
            min: min as f64,
            max: max as f64,
            extended: false,
        }
    }

    fn flag(key: String, space: Space) -> Self {
        Self {
            key,
            space,
            default: ParamValue::Bool(true),
            min: 0.0,
            max: 1.0,
            extended: false,
        }
    }

    /// Accepted range: the optimizer range widened to include the default.
    pub fn accepted_range(&self) -> (f64, f64) {
        let d = self.default.as_f64();
        (self.min.min(d), self.max.max(d))
    }

    /// Parse and range-check a raw configuration value for this key.
    pub fn parse(&self, raw: &str) -> Result<ParamValue, MohoError> {
        let raw = raw.trim();
        let invalid = |reason: String| MohoError::InvalidParameter {
            key: self.key.clone(),
            reason,
        };

        let value = match self.default {
            ParamValue::Bool(_) => ParamValue::Bool(
                parse_bool(raw).ok_or_else(|| invalid(format!("'{}' is not a boolean", raw)))?,
            ),
            ParamValue::Int(_) => ParamValue::Int(
                raw.parse::<i64>()
                    .map_err(|_| invalid(format!("'{}' is not an integer", raw)))?,
            ),
            ParamValue::Decimal(_) => {
                let v = raw
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("'{}' is not a number", raw)))?;
                if !v.is_finite() {
                    return Err(invalid(format!("'{}' is not finite", raw)));
                }
                ParamValue::Decimal(v)
            }
        };

        if !matches!(value, ParamValue::Bool(_)) {
            let (lo, hi) = self.accepted_range();
            let v = value.as_f64();
            if v < lo || v > hi {
                return Err(invalid(format!("{} outside [{}, {}]", v, lo, hi)));
            }
        }
        Ok(value)
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

pub fn entry_enable_key(id: u8) -> String {
    format!("buy_condition_{}_enable", id)
}

pub fn exit_enable_key(id: u8) -> String {
    format!("sell_condition_{}_enable", id)
}

/// The full parameter table, built once.
pub fn param_specs() -> &'static [ParamSpec] {
    static SPECS: OnceLock<Vec<ParamSpec>> = OnceLock::new();
    SPECS.get_or_init(build_specs)
}

pub fn find_spec(key: &str) -> Option<&'static ParamSpec> {
    param_specs().iter().find(|s| s.key == key)
}

/// Thresholds of the wider condition set: dip and pump guards, 1h RSI
/// bands, Bollinger and EMA offsets. `(key, default, min, max)`.
const EXTENDED_BUY: &[(&str, f64, f64, f64)] = &[
    ("buy_dip_threshold_1", 0.02, 0.001, 0.05),
    ("buy_dip_threshold_2", 0.14, 0.01, 0.2),
    ("buy_dip_threshold_3", 0.32, 0.05, 0.4),
    ("buy_dip_threshold_4", 0.5, 0.2, 0.5),
    ("buy_dip_threshold_5", 0.015, 0.001, 0.05),
    ("buy_dip_threshold_6", 0.06, 0.01, 0.2),
    ("buy_dip_threshold_7", 0.24, 0.05, 0.4),
    ("buy_dip_threshold_8", 0.4, 0.2, 0.5),
    ("buy_dip_threshold_9", 0.026, 0.001, 0.05),
    ("buy_dip_threshold_10", 0.24, 0.01, 0.2),
    ("buy_dip_threshold_11", 0.42, 0.05, 0.4),
    ("buy_dip_threshold_12", 0.66, 0.2, 0.5),
    ("buy_pump_pull_threshold_1", 1.75, 1.5, 3.0),
    ("buy_pump_threshold_1", 0.5, 0.4, 1.0),
    ("buy_pump_pull_threshold_2", 1.75, 1.5, 3.0),
    ("buy_pump_threshold_2", 0.56, 0.4, 1.0),
    ("buy_pump_pull_threshold_3", 1.75, 1.5, 3.0),
    ("buy_pump_threshold_3", 0.85, 0.4, 1.0),
    ("buy_pump_pull_threshold_4", 2.2, 1.5, 3.0),
    ("buy_pump_threshold_4", 0.4, 0.4, 1.0),
    ("buy_pump_pull_threshold_5", 2.0, 1.5, 3.0),
    ("buy_pump_threshold_5", 0.56, 0.4, 1.0),
    ("buy_pump_pull_threshold_6", 2.0, 1.5, 3.0),
    ("buy_pump_threshold_6", 0.68, 0.4, 1.0),
    ("buy_pump_pull_threshold_7", 1.7, 1.5, 3.0),
    ("buy_pump_threshold_7", 0.66, 0.4, 1.0),
    ("buy_pump_pull_threshold_8", 1.7, 1.5, 3.0),
    ("buy_pump_threshold_8", 0.7, 0.4, 1.0),
    ("buy_pump_pull_threshold_9", 1.4, 1.5, 3.0),
    ("buy_pump_threshold_9", 1.3, 0.4, 1.8),
    ("buy_min_inc_1", 0.022, 0.01, 0.05),
    ("buy_rsi_1h_min_1", 30.0, 25.0, 40.0),
    ("buy_rsi_1h_max_1", 84.0, 70.0, 90.0),
    ("buy_rsi_1h_min_2", 32.0, 30.0, 40.0),
    ("buy_rsi_1h_max_2", 84.0, 70.0, 95.0),
    ("buy_rsi_1h_diff_2", 39.0, 30.0, 50.0),
    ("buy_bb_offset_2", 0.983, 0.97, 0.999),
    ("buy_bb40_bbdelta_close_3", 0.057, 0.005, 0.06),
    ("buy_bb40_closedelta_close_3", 0.023, 0.01, 0.03),
    ("buy_bb40_tail_bbdelta_3", 0.418, 0.15, 0.45),
    ("buy_ema_rel_3", 0.986, 0.97, 0.999),
    ("buy_bb20_close_bblowerband_4", 0.979, 0.96, 0.99),
    ("buy_bb20_volume_4", 10.0, 1.0, 20.0),
    ("buy_ema_open_mult_5", 0.019, 0.016, 0.03),
    ("buy_bb_offset_5", 0.999, 0.98, 1.0),
    ("buy_ema_rel_5", 0.982, 0.97, 0.999),
    ("buy_ema_open_mult_6", 0.025, 0.02, 0.03),
    ("buy_bb_offset_6", 0.984, 0.98, 0.999),
    ("buy_volume_7", 2.0, 1.0, 10.0),
    ("buy_ema_open_mult_7", 0.03, 0.02, 0.04),
    ("buy_rsi_7", 36.0, 24.0, 50.0),
    ("buy_ema_rel_7", 0.986, 0.97, 0.999),
    ("buy_volume_8", 2.0, 1.0, 6.0),
    ("buy_rsi_8", 20.0, 36.0, 40.0),
    ("buy_tail_diff_8", 3.5, 3.0, 10.0),
    ("buy_volume_9", 1.0, 1.0, 4.0),
    ("buy_ma_offset_9", 0.97, 0.94, 0.99),
    ("buy_bb_offset_9", 0.985, 0.97, 0.99),
    ("buy_rsi_1h_min_9", 30.0, 26.0, 40.0),
    ("buy_rsi_1h_max_9", 88.0, 70.0, 90.0),
    ("buy_mfi_9", 30.0, 36.0, 65.0),
    ("buy_volume_10", 2.4, 1.0, 8.0),
    ("buy_ma_offset_10", 0.944, 0.93, 0.97),
    ("buy_bb_offset_10", 0.994, 0.97, 0.99),
    ("buy_rsi_1h_10", 37.0, 20.0, 40.0),
    ("buy_ma_offset_11", 0.939, 0.93, 0.99),
    ("buy_min_inc_11", 0.022, 0.005, 0.05),
    ("buy_rsi_1h_min_11", 56.0, 40.0, 60.0),
    ("buy_rsi_1h_max_11", 84.0, 70.0, 90.0),
    ("buy_rsi_11", 48.0, 30.0, 48.0),
    ("buy_mfi_11", 38.0, 36.0, 56.0),
    ("buy_volume_12", 1.7, 1.0, 10.0),
    ("buy_ma_offset_12", 0.936, 0.93, 0.97),
    ("buy_rsi_12", 30.0, 26.0, 40.0),
    ("buy_ewo_12", 2.0, 2.0, 6.0),
    ("buy_volume_13", 1.6, 1.0, 10.0),
    ("buy_ma_offset_13", 0.978, 0.93, 0.98),
    ("buy_ewo_13", -10.4, -14.0, -7.0),
    ("buy_volume_14", 2.0, 1.0, 10.0),
    ("buy_ema_open_mult_14", 0.014, 0.01, 0.03),
    ("buy_bb_offset_14", 0.986, 0.98, 1.0),
    ("buy_ma_offset_14", 0.97, 0.93, 0.99),
    ("buy_volume_15", 2.0, 1.0, 10.0),
    ("buy_ema_open_mult_15", 0.018, 0.02, 0.04),
    ("buy_ma_offset_15", 0.954, 0.93, 0.99),
    ("buy_rsi_15", 28.0, 30.0, 50.0),
    ("buy_ema_rel_15", 0.988, 0.97, 0.999),
    ("buy_volume_16", 2.0, 1.0, 10.0),
    ("buy_ma_offset_16", 0.952, 0.93, 0.97),
    ("buy_rsi_16", 31.0, 26.0, 50.0),
    ("buy_ewo_16", 2.8, 4.0, 8.0),
    ("buy_volume_17", 2.0, 0.5, 8.0),
    ("buy_ma_offset_17", 0.958, 0.93, 0.98),
    ("buy_ewo_17", -12.0, -18.0, -10.0),
    ("buy_volume_18", 2.0, 1.0, 6.0),
    ("buy_rsi_18", 26.0, 16.0, 32.0),
    ("buy_bb_offset_18", 0.982, 0.98, 1.0),
    ("buy_rsi_1h_min_19", 50.0, 40.0, 70.0),
    ("buy_chop_min_19", 24.1, 20.0, 60.0),
    ("buy_volume_20", 1.2, 0.5, 6.0),
    ("buy_rsi_20", 26.0, 20.0, 36.0),
    ("buy_rsi_1h_20", 20.0, 14.0, 30.0),
    ("buy_volume_21", 3.0, 0.5, 6.0),
    ("buy_rsi_21", 23.0, 10.0, 28.0),
    ("buy_rsi_1h_21", 24.0, 18.0, 40.0),
];

/// Declining-profit and trailing-ceiling exit thresholds. `(key, default, min, max)`.
const EXTENDED_SELL: &[(&str, f64, f64, f64)] = &[
    ("sell_custom_dec_profit_1", 0.05, 0.01, 0.10),
    ("sell_custom_dec_profit_2", 0.07, 0.05, 0.2),
    ("sell_trail_profit_max_1", 0.46, 0.3, 0.5),
    ("sell_trail_profit_max_2", 0.12, 0.08, 0.25),
    ("sell_trail_profit_max_3", 0.1, 0.08, 0.16),
    ("sell_custom_profit_under_rel_1", 0.024, 0.01, 0.04),
    ("sell_custom_profit_under_rsi_diff_1", 4.4, 0.0, 20.0),
];

fn build_specs() -> Vec<ParamSpec> {
    use Space::{Buy, Sell};

    let mut specs = vec![
        ParamSpec::int("base_nb_candles_buy", Buy, 20, 5, 80),
        ParamSpec::int("base_nb_candles_sell", Sell, 20, 5, 80),
    ];
    for kind in MaKind::ALL {
        specs.push(ParamSpec::decimal(&kind.low_offset_key(), Buy, 0.958, 0.9, 0.99));
        specs.push(ParamSpec::decimal(&kind.high_offset_key(), Sell, 1.012, 0.99, 1.1));
    }
    specs.extend([
        ParamSpec::int("fast_ewo", Buy, 50, 10, 50),
        ParamSpec::int("slow_ewo", Buy, 200, 100, 200),
        ParamSpec::decimal("ewo_low", Buy, -20.0, -20.0, -8.0),
        ParamSpec::decimal("ewo_high", Buy, 6.0, 2.0, 12.0),
    ]);

    specs.extend((1..=ENTRY_GROUP_COUNT).map(|id| ParamSpec::flag(entry_enable_key(id), Buy)));
    specs.extend([
        ParamSpec::decimal("buy_rsi_1", Buy, 36.0, 20.0, 40.0),
        ParamSpec::decimal("buy_mfi_1", Buy, 26.0, 20.0, 40.0),
        ParamSpec::decimal("buy_mfi_2", Buy, 49.0, 30.0, 56.0),
        ParamSpec::decimal("buy_volume_2", Buy, 2.6, 1.0, 10.0),
    ]);

    specs.extend((1..=EXIT_GROUP_COUNT).map(|id| ParamSpec::flag(exit_enable_key(id), Sell)));
    specs.extend([
        ParamSpec::decimal("sell_rsi_bb_1", Sell, 79.5, 60.0, 80.0),
        ParamSpec::decimal("sell_rsi_bb_2", Sell, 81.0, 72.0, 90.0),
        ParamSpec::decimal("sell_rsi_main_3", Sell, 82.0, 77.0, 90.0),
        ParamSpec::decimal("sell_dual_rsi_rsi_4", Sell, 73.4, 72.0, 84.0),
        ParamSpec::decimal("sell_dual_rsi_rsi_1h_4", Sell, 79.6, 78.0, 92.0),
        ParamSpec::decimal("sell_ema_relative_5", Sell, 0.024, 0.005, 0.05),
        ParamSpec::decimal("sell_rsi_diff_5", Sell, 4.4, 0.0, 20.0),
        ParamSpec::decimal("sell_rsi_under_6", Sell, 79.0, 72.0, 90.0),
        ParamSpec::decimal("sell_rsi_1h_7", Sell, 81.7, 80.0, 95.0),
        ParamSpec::decimal("sell_bb_relative_8", Sell, 1.1, 1.05, 1.3),
    ]);

    // Profit-take ladder, tiers 0..=4.
    let profit_tiers = [
        (0.01, 0.01, 0.1, 33.0, 30.0, 40.0),
        (0.03, 0.01, 0.1, 38.0, 30.0, 50.0),
        (0.05, 0.01, 0.1, 43.0, 34.0, 50.0),
        (0.08, 0.06, 0.30, 48.0, 38.0, 55.0),
        (0.25, 0.3, 0.6, 50.0, 40.0, 58.0),
    ];
    for (tier, (p, p_lo, p_hi, r, r_lo, r_hi)) in profit_tiers.into_iter().enumerate() {
        specs.push(ParamSpec::decimal(
            &format!("sell_custom_profit_{}", tier),
            Sell,
            p,
            p_lo,
            p_hi,
        ));
        specs.push(ParamSpec::decimal(
            &format!("sell_custom_rsi_{}", tier),
            Sell,
            r,
            r_lo,
            r_hi,
        ));
    }

    // Loss-cut ladder, tiers 1..=3.
    let under_tiers = [
        (0.02, 56.0, 36.0, 60.0),
        (0.04, 60.0, 46.0, 66.0),
        (0.6, 62.0, 50.0, 68.0),
    ];
    for (i, (p, r, r_lo, r_hi)) in under_tiers.into_iter().enumerate() {
        let tier = i + 1;
        specs.push(ParamSpec::decimal(
            &format!("sell_custom_under_profit_{}", tier),
            Sell,
            p,
            0.01,
            0.10,
        ));
        specs.push(ParamSpec::decimal(
            &format!("sell_custom_under_rsi_{}", tier),
            Sell,
            r,
            r_lo,
            r_hi,
        ));
    }

    // Trailing giveback bands 1..=3.
    let trail_bands = [
        (0.15, 0.1, 0.25, 0.18, 0.04, 0.2),
        (0.01, 0.01, 0.1, 0.14, 0.04, 0.2),
        (0.05, 0.01, 0.1, 0.01, 0.01, 0.04),
    ];
    for (i, (m, m_lo, m_hi, d, d_lo, d_hi)) in trail_bands.into_iter().enumerate() {
        let band = i + 1;
        specs.push(ParamSpec::decimal(
            &format!("sell_trail_profit_min_{}", band),
            Sell,
            m,
            m_lo,
            m_hi,
        ));
        specs.push(ParamSpec::decimal(
            &format!("sell_trail_down_{}", band),
            Sell,
            d,
            d_lo,
            d_hi,
        ));
    }

    specs.extend([
        ParamSpec::decimal("sell_custom_stoploss_under_rel_1", Sell, 0.004, 0.001, 0.02),
        ParamSpec::decimal("sell_custom_stoploss_under_rsi_diff_1", Sell, 8.0, 0.0, 20.0),
    ]);

    for (space, table) in [(Buy, EXTENDED_BUY), (Sell, EXTENDED_SELL)] {
        specs.extend(
            table
                .iter()
                .map(|&(key, default, min, max)| ParamSpec::extended(key, space, default, min, max)),
        );
    }

    specs
}

/// Immutable set of resolved parameter values keyed by stable name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBundle {
    values: BTreeMap<String, ParamValue>,
}

impl Default for ParameterBundle {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ParameterBundle {
    pub fn defaults() -> Self {
        Self {
            values: param_specs()
                .iter()
                .map(|s| (s.key.clone(), s.default))
                .collect(),
        }
    }

    /// Defaults overlaid with raw `(key, value)` pairs. Unknown keys,
    /// unparsable values and out-of-range values are rejected.
    pub fn from_overrides<'a, I>(overrides: I) -> Result<Self, MohoError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut bundle = Self::defaults();
        for (key, raw) in overrides {
            let spec = find_spec(key).ok_or_else(|| MohoError::InvalidParameter {
                key: key.to_string(),
                reason: "no such parameter".to_string(),
            })?;
            let value = spec.parse(raw)?;
            bundle.values.insert(spec.key.clone(), value);
        }
        Ok(bundle)
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.values.get(key).copied()
    }

    fn require(&self, key: &str) -> Result<ParamValue, MohoError> {
        self.get(key).ok_or_else(|| MohoError::UnknownParameter {
            key: key.to_string(),
        })
    }

    /// Numeric value of any parameter.
    pub fn decimal(&self, key: &str) -> Result<f64, MohoError> {
        self.require(key).map(|v| v.as_f64())
    }

    /// Integer parameter as a window length.
    pub fn period(&self, key: &str) -> Result<usize, MohoError> {
        match self.require(key)? {
            ParamValue::Int(v) if v > 0 => Ok(v as usize),
            other => Err(MohoError::InvalidParameter {
                key: key.to_string(),
                reason: format!("expected a positive integer, found {} {}", other.kind(), other),
            }),
        }
    }

    pub fn flag(&self, key: &str) -> Result<bool, MohoError> {
        match self.require(key)? {
            ParamValue::Bool(v) => Ok(v),
            other => Err(MohoError::InvalidParameter {
                key: key.to_string(),
                reason: format!("expected a boolean, found {} {}", other.kind(), other),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
