//! Strategy composition: settings, parameters, rule groups and exit policy.

use crate::domain::catalog::merged_columns;
use crate::domain::error::MohoError;
use crate::domain::exit_policy::{ExitDecision, ExitPolicy, confirm_trade_entry};
use crate::domain::params::ParameterBundle;
use crate::domain::pipeline::AnalyzedFrame;
use crate::domain::position::{OpenPosition, TradeSide};
use crate::domain::settings::StrategySettings;
use crate::domain::signal::RuleSet;
use std::collections::BTreeMap;
use tracing::debug;

/// Exit decision plus the settings-level checks a host consults per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitAssessment {
    pub profit: f64,
    pub custom_exit: Option<ExitDecision>,
    pub custom_stoploss: Option<String>,
    pub roi_reached: bool,
    /// The latest candle's exit signal, when the settings let it close the trade.
    pub exit_signal: bool,
    pub trailing_stop_rate: Option<f64>,
    pub stop_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub settings: StrategySettings,
    pub params: ParameterBundle,
    pub rules: RuleSet,
    pub exit_policy: ExitPolicy,
}

impl Strategy {
    /// Built-in rule groups over `params`.
    pub fn new(settings: StrategySettings, params: ParameterBundle) -> Result<Self, MohoError> {
        Self::with_rule_overrides(settings, params, &BTreeMap::new(), &BTreeMap::new())
    }

    /// Fails when an enabled group reads a column the pipeline never
    /// produces for the configured informative timeframe.
    pub fn with_rule_overrides(
        settings: StrategySettings,
        params: ParameterBundle,
        entry_overrides: &BTreeMap<u8, String>,
        exit_overrides: &BTreeMap<u8, String>,
    ) -> Result<Self, MohoError> {
        if settings.timeframe.ratio_to(&settings.informative_timeframe).is_none() {
            return Err(MohoError::MisalignedTimeframes {
                primary: settings.timeframe.label().to_string(),
                informative: settings.informative_timeframe.label().to_string(),
            });
        }

        let rules = RuleSet::with_overrides(&params, entry_overrides, exit_overrides)?;
        let available = merged_columns(settings.informative_timeframe.label());
        rules.check_columns(available.iter().map(String::as_str))?;
        let exit_policy = ExitPolicy::from_params(&params)?;

        Ok(Self {
            settings,
            params,
            rules,
            exit_policy,
        })
    }

    pub fn defaults() -> Result<Self, MohoError> {
        Self::new(StrategySettings::default(), ParameterBundle::defaults())
    }

    /// Custom exit against the latest analyzed row; `None` on an empty frame.
    pub fn custom_exit(
        &self,
        analyzed: &AnalyzedFrame,
        position: &OpenPosition,
    ) -> Option<ExitDecision> {
        self.exit_policy.custom_exit(position, &analyzed.last_row()?)
    }

    pub fn custom_stoploss(&self, analyzed: &AnalyzedFrame, position: &OpenPosition) -> Option<String> {
        self.exit_policy
            .custom_stoploss(position, &analyzed.last_row()?)
    }

    /// Entry fill guard against the latest analyzed close.
    pub fn confirm_trade_entry(&self, analyzed: &AnalyzedFrame, side: TradeSide, rate: f64) -> bool {
        analyzed
            .last_row()
            .is_some_and(|row| confirm_trade_entry(side, rate, &row))
    }

    pub fn assess_exit(&self, analyzed: &AnalyzedFrame, position: &OpenPosition) -> ExitAssessment {
        let settings = &self.settings;
        let profit = position.current_profit();
        let custom_exit = self.custom_exit(analyzed, position);
        let custom_stoploss = if settings.use_custom_stoploss {
            self.custom_stoploss(analyzed, position)
        } else {
            None
        };
        let entry_signal = analyzed.last_signal().is_some_and(|s| s.entry.active);
        let roi_reached = !(settings.ignore_roi_if_entry_signal && entry_signal)
            && settings.minimal_roi_reached(position.trade_minutes(), profit);
        let exit_signal = analyzed.last_signal().is_some_and(|s| s.exit.active)
            && settings.exit_signal_allowed(profit);

        debug!(
            pair = %position.pair,
            profit,
            custom_exit = custom_exit.is_some(),
            roi_reached,
            exit_signal,
            "assessed open position"
        );
        ExitAssessment {
            profit,
            custom_exit,
            custom_stoploss,
            roi_reached,
            exit_signal,
            trailing_stop_rate: settings.trailing_stop_rate(position),
            stop_rate: settings.effective_stop_rate(position),
        }
    }
}
