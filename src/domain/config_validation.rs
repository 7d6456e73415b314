//! Configuration loading and validation.
//!
//! Reads the `[strategy]`, `[buy]`, `[sell]`, `[entry_rules]` and
//! `[exit_rules]` sections through a `ConfigPort` and validates every value
//! before anything is computed. Nothing is clamped: a bad value is an error.

use crate::domain::error::MohoError;
use crate::domain::ohlcv::Timeframe;
use crate::domain::params::{
    ENTRY_GROUP_COUNT, EXIT_GROUP_COUNT, ParameterBundle, Space, find_spec, parse_bool,
};
use crate::domain::settings::{RoiTable, StrategySettings};
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const STRATEGY_SECTION: &str = "strategy";
pub const ENTRY_RULES_SECTION: &str = "entry_rules";
pub const EXIT_RULES_SECTION: &str = "exit_rules";

const STRATEGY_KEYS: &[&str] = &[
    "timeframe",
    "informative_timeframe",
    "startup_candle_count",
    "stoploss",
    "minimal_roi",
    "trailing_stop",
    "trailing_only_offset_is_reached",
    "trailing_stop_positive",
    "trailing_stop_positive_offset",
    "use_custom_stoploss",
    "use_exit_signal",
    "exit_profit_only",
    "ignore_roi_if_entry_signal",
];

/// Build a fully validated strategy from configuration.
pub fn load_strategy(config: &dyn ConfigPort) -> Result<Strategy, MohoError> {
    validate_sections(config)?;
    let settings = load_settings(config)?;
    let params = load_parameters(config)?;
    let entry = load_rule_overrides(config, ENTRY_RULES_SECTION, ENTRY_GROUP_COUNT)?;
    let exit = load_rule_overrides(config, EXIT_RULES_SECTION, EXIT_GROUP_COUNT)?;
    let strategy = Strategy::with_rule_overrides(settings, params, &entry, &exit)?;
    for key in unreferenced_parameters(config, &strategy) {
        warn!(%key, "parameter accepted but no enabled rule group reads it");
    }
    info!(
        timeframe = %strategy.settings.timeframe,
        informative = %strategy.settings.informative_timeframe,
        entry_overrides = entry.len(),
        exit_overrides = exit.len(),
        "strategy configuration loaded"
    );
    Ok(strategy)
}

/// Configured extended parameters that no enabled rule group references.
pub fn unreferenced_parameters(config: &dyn ConfigPort, strategy: &Strategy) -> Vec<String> {
    let referenced = strategy.rules.referenced_params();
    [Space::Buy, Space::Sell]
        .into_iter()
        .flat_map(|space| config.keys(space.section()))
        .filter(|key| find_spec(key).is_some_and(|spec| spec.extended))
        .filter(|key| !referenced.contains(key.as_str()))
        .collect()
}

fn validate_sections(config: &dyn ConfigPort) -> Result<(), MohoError> {
    let known = [
        STRATEGY_SECTION,
        Space::Buy.section(),
        Space::Sell.section(),
        ENTRY_RULES_SECTION,
        EXIT_RULES_SECTION,
    ];
    for section in config.sections() {
        if !known.contains(&section.as_str()) {
            return Err(MohoError::ConfigInvalid {
                key: config.keys(&section).into_iter().next().unwrap_or_default(),
                section,
                reason: format!("unknown section, expected one of {}", known.join(", ")),
            });
        }
    }
    Ok(())
}

fn invalid(key: &str, reason: impl Into<String>) -> MohoError {
    MohoError::ConfigInvalid {
        section: STRATEGY_SECTION.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn setting<T: FromStr>(config: &dyn ConfigPort, key: &str, default: T) -> Result<T, MohoError> {
    match config.get_string(STRATEGY_SECTION, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, format!("cannot parse '{}'", raw.trim()))),
    }
}

fn flag_setting(config: &dyn ConfigPort, key: &str, default: bool) -> Result<bool, MohoError> {
    match config.get_string(STRATEGY_SECTION, key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| invalid(key, format!("'{}' is not a boolean", raw))),
    }
}

fn timeframe_setting(
    config: &dyn ConfigPort,
    key: &str,
    default: Timeframe,
) -> Result<Timeframe, MohoError> {
    match config.get_string(STRATEGY_SECTION, key) {
        None => Ok(default),
        Some(raw) => Timeframe::parse(&raw).map_err(|e| invalid(key, e.to_string())),
    }
}

/// `[strategy]` settings over the built-in defaults.
pub fn load_settings(config: &dyn ConfigPort) -> Result<StrategySettings, MohoError> {
    if let Some(key) = config
        .keys(STRATEGY_SECTION)
        .into_iter()
        .find(|k| !STRATEGY_KEYS.contains(&k.as_str()))
    {
        return Err(invalid(&key, "unknown setting"));
    }

    let defaults = StrategySettings::default();
    let minimal_roi = match config.get_string(STRATEGY_SECTION, "minimal_roi") {
        None => defaults.minimal_roi.clone(),
        Some(raw) => RoiTable::parse(&raw).map_err(|reason| invalid("minimal_roi", reason))?,
    };

    let settings = StrategySettings {
        timeframe: timeframe_setting(config, "timeframe", defaults.timeframe.clone())?,
        informative_timeframe: timeframe_setting(
            config,
            "informative_timeframe",
            defaults.informative_timeframe.clone(),
        )?,
        startup_candle_count: setting(
            config,
            "startup_candle_count",
            defaults.startup_candle_count,
        )?,
        stoploss: setting(config, "stoploss", defaults.stoploss)?,
        minimal_roi,
        trailing_stop: flag_setting(config, "trailing_stop", defaults.trailing_stop)?,
        trailing_only_offset_is_reached: flag_setting(
            config,
            "trailing_only_offset_is_reached",
            defaults.trailing_only_offset_is_reached,
        )?,
        trailing_stop_positive: setting(
            config,
            "trailing_stop_positive",
            defaults.trailing_stop_positive,
        )?,
        trailing_stop_positive_offset: setting(
            config,
            "trailing_stop_positive_offset",
            defaults.trailing_stop_positive_offset,
        )?,
        use_custom_stoploss: flag_setting(
            config,
            "use_custom_stoploss",
            defaults.use_custom_stoploss,
        )?,
        use_exit_signal: flag_setting(config, "use_exit_signal", defaults.use_exit_signal)?,
        exit_profit_only: flag_setting(config, "exit_profit_only", defaults.exit_profit_only)?,
        ignore_roi_if_entry_signal: flag_setting(
            config,
            "ignore_roi_if_entry_signal",
            defaults.ignore_roi_if_entry_signal,
        )?,
    };

    validate_settings(&settings)?;
    debug!(?settings, "strategy settings loaded");
    Ok(settings)
}

fn validate_settings(settings: &StrategySettings) -> Result<(), MohoError> {
    if !(settings.stoploss > -1.0 && settings.stoploss < 0.0) {
        return Err(invalid("stoploss", "stoploss must be between -1 and 0"));
    }
    if settings.informative_timeframe.minutes() <= settings.timeframe.minutes() {
        return Err(invalid(
            "informative_timeframe",
            "informative_timeframe must be coarser than timeframe",
        ));
    }
    if !(settings.trailing_stop_positive > 0.0 && settings.trailing_stop_positive < 1.0) {
        return Err(invalid(
            "trailing_stop_positive",
            "trailing_stop_positive must be between 0 and 1",
        ));
    }
    if settings.trailing_stop_positive_offset < settings.trailing_stop_positive {
        return Err(invalid(
            "trailing_stop_positive_offset",
            "trailing_stop_positive_offset must not be below trailing_stop_positive",
        ));
    }
    Ok(())
}

/// `[buy]` and `[sell]` overrides applied to the parameter defaults.
pub fn load_parameters(config: &dyn ConfigPort) -> Result<ParameterBundle, MohoError> {
    let mut overrides: Vec<(String, String)> = Vec::new();
    for space in [Space::Buy, Space::Sell] {
        let section = space.section();
        for key in config.keys(section) {
            let spec = find_spec(&key).ok_or_else(|| MohoError::UnknownParameter { key: key.clone() })?;
            if spec.space != space {
                return Err(MohoError::ConfigInvalid {
                    section: section.to_string(),
                    reason: format!("parameter belongs in [{}]", spec.space.section()),
                    key,
                });
            }
            let raw = config.get_string(section, &key).unwrap_or_default();
            overrides.push((key, raw));
        }
    }

    let bundle =
        ParameterBundle::from_overrides(overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    debug!(overrides = overrides.len(), "parameter bundle loaded");
    Ok(bundle)
}

/// `group_<n>` expression overrides from one rule section.
pub fn load_rule_overrides(
    config: &dyn ConfigPort,
    section: &str,
    group_count: u8,
) -> Result<BTreeMap<u8, String>, MohoError> {
    let mut overrides = BTreeMap::new();
    for key in config.keys(section) {
        let id = key
            .strip_prefix("group_")
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|id| (1..=group_count).contains(id))
            .ok_or_else(|| MohoError::ConfigInvalid {
                section: section.to_string(),
                key: key.clone(),
                reason: format!("expected group_<n> with n in 1..={}", group_count),
            })?;
        let expression = config
            .get_string(section, &key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MohoError::ConfigInvalid {
                section: section.to_string(),
                key: key.clone(),
                reason: "empty rule expression".to_string(),
            })?;
        overrides.insert(id, expression);
    }
    Ok(overrides)
}
