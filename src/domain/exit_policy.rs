//! Per-position exit decisions.
//!
//! Evaluated on demand against the latest analyzed row of a pair. Three
//! ordered families are tried and the first match wins:
//!
//! 1. Profit-take ladder, tiers 4 down to 0
//! 2. Loss-cut ladder, tiers 3 down to 1
//! 3. Trailing giveback, bands 1 up to 3
//!
//! Comparisons against an undefined RSI never match.

use crate::domain::error::MohoError;
use crate::domain::frame::Row;
use crate::domain::params::ParameterBundle;
use crate::domain::position::{OpenPosition, TradeSide};
use std::fmt;

/// Fraction of the last close an entry fill may deviate by.
pub const ENTRY_SLIPPAGE_TOLERANCE: f64 = 0.0025;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitTier {
    pub tier: u8,
    pub min_profit: f64,
    pub max_rsi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossTier {
    pub tier: u8,
    pub max_profit: f64,
    pub min_rsi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailBand {
    pub band: u8,
    pub min_max_profit: f64,
    pub giveback: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitReason {
    ProfitTake { tier: u8, rsi: f64 },
    LossCut { tier: u8, rsi: f64 },
    TrailingGiveback { band: u8, max_profit: f64, profit: f64 },
}

impl ExitReason {
    /// Stable identifier of the rule that matched, without the live values.
    pub fn tag(&self) -> String {
        match self {
            ExitReason::ProfitTake { tier, .. } => format!("custom_profit_{}", tier),
            ExitReason::LossCut { tier, .. } => format!("custom_under_profit_{}", tier),
            ExitReason::TrailingGiveback { band, .. } => format!("custom_trail_{}", band),
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::ProfitTake { rsi, .. } | ExitReason::LossCut { rsi, .. } => {
                write!(f, "{}_rsi_{:.2}", self.tag(), rsi)
            }
            ExitReason::TrailingGiveback {
                max_profit, profit, ..
            } => write!(
                f,
                "{}_max_{:.4}_profit_{:.4}",
                self.tag(),
                max_profit,
                profit
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitDecision {
    pub reason: ExitReason,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitPolicy {
    /// Highest tier first.
    profit_tiers: Vec<ProfitTier>,
    /// Highest tier first.
    loss_tiers: Vec<LossTier>,
    /// Lowest band first.
    trail_bands: Vec<TrailBand>,
    stoploss_max_profit: f64,
    stoploss_rsi_diff: f64,
}

impl ExitPolicy {
    pub fn from_params(params: &ParameterBundle) -> Result<Self, MohoError> {
        let profit_tiers = (0..=4u8)
            .rev()
            .map(|tier| {
                Ok(ProfitTier {
                    tier,
                    min_profit: params.decimal(&format!("sell_custom_profit_{}", tier))?,
                    max_rsi: params.decimal(&format!("sell_custom_rsi_{}", tier))?,
                })
            })
            .collect::<Result<_, MohoError>>()?;
        let loss_tiers = (1..=3u8)
            .rev()
            .map(|tier| {
                Ok(LossTier {
                    tier,
                    max_profit: params.decimal(&format!("sell_custom_under_profit_{}", tier))?,
                    min_rsi: params.decimal(&format!("sell_custom_under_rsi_{}", tier))?,
                })
            })
            .collect::<Result<_, MohoError>>()?;
        let trail_bands = (1..=3u8)
            .map(|band| {
                Ok(TrailBand {
                    band,
                    min_max_profit: params.decimal(&format!("sell_trail_profit_min_{}", band))?,
                    giveback: params.decimal(&format!("sell_trail_down_{}", band))?,
                })
            })
            .collect::<Result<_, MohoError>>()?;

        Ok(Self {
            profit_tiers,
            loss_tiers,
            trail_bands,
            stoploss_max_profit: params.decimal("sell_custom_stoploss_under_rel_1")?,
            stoploss_rsi_diff: params.decimal("sell_custom_stoploss_under_rsi_diff_1")?,
        })
    }

    pub fn profit_tiers(&self) -> &[ProfitTier] {
        &self.profit_tiers
    }

    pub fn loss_tiers(&self) -> &[LossTier] {
        &self.loss_tiers
    }

    pub fn trail_bands(&self) -> &[TrailBand] {
        &self.trail_bands
    }

    /// Exit decision for `position` given the latest analyzed `row`.
    pub fn custom_exit(&self, position: &OpenPosition, row: &Row<'_>) -> Option<ExitDecision> {
        let profit = position.current_profit();
        self.decide(profit, position.max_profit(), row.get("rsi"))
            .map(|reason| ExitDecision { reason, profit })
    }

    /// Family ladder over raw inputs.
    pub fn decide(&self, profit: f64, max_profit: f64, rsi: Option<f64>) -> Option<ExitReason> {
        if let Some(rsi) = rsi {
            if let Some(t) = self
                .profit_tiers
                .iter()
                .find(|t| profit > t.min_profit && rsi < t.max_rsi)
            {
                return Some(ExitReason::ProfitTake { tier: t.tier, rsi });
            }
            if let Some(t) = self
                .loss_tiers
                .iter()
                .find(|t| profit < t.max_profit && rsi > t.min_rsi)
            {
                return Some(ExitReason::LossCut { tier: t.tier, rsi });
            }
        }

        self.trail_bands
            .iter()
            .find(|b| max_profit > b.min_max_profit && profit < max_profit - b.giveback)
            .map(|b| ExitReason::TrailingGiveback {
                band: b.band,
                max_profit,
                profit,
            })
    }

    /// Stop-loss reason for `position`, if the adaptive stop triggers.
    pub fn custom_stoploss(&self, position: &OpenPosition, row: &Row<'_>) -> Option<String> {
        let profit = position.current_profit();
        let rsi = row.get("rsi")?;
        if profit < self.stoploss_max_profit && stoploss_rsi_condition(rsi, self.stoploss_rsi_diff) {
            Some(format!("custom_stoploss_profit_{:.4}", profit))
        } else {
            None
        }
    }
}

/// RSI test of the adaptive stop-loss.
///
/// Compares the row's RSI against itself plus the configured difference, so
/// for any non-negative difference it never holds. Kept exactly as tuned.
fn stoploss_rsi_condition(rsi: f64, rsi_diff: f64) -> bool {
    rsi > rsi + rsi_diff
}

/// Reject an entry whose fill rate strays too far from the last close.
/// An undefined close rejects.
pub fn confirm_trade_entry(side: TradeSide, rate: f64, row: &Row<'_>) -> bool {
    let Some(close) = row.get("close") else {
        return false;
    };
    match side {
        TradeSide::Long => rate <= close * (1.0 + ENTRY_SLIPPAGE_TOLERANCE),
        TradeSide::Short => rate >= close * (1.0 - ENTRY_SLIPPAGE_TOLERANCE),
    }
}
