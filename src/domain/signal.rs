//! Entry and exit rule groups and per-row signal classification.
//!
//! Each side owns a list of numbered groups. A group is one rule expression
//! plus its enable flag; groups are data, evaluated by the single rule
//! interpreter in `rule_eval`. A row's entry (exit) signal is the OR of the
//! enabled entry (exit) groups, and the lowest fired group id names the tag.

use crate::domain::error::MohoError;
use crate::domain::frame::{Frame, Row};
use crate::domain::params::{
    ENTRY_GROUP_COUNT, EXIT_GROUP_COUNT, ParameterBundle, entry_enable_key, exit_enable_key,
};
use crate::domain::rule::Rule;
use crate::domain::rule_eval::evaluate;
use crate::domain::rule_parser::parse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Entry,
    Exit,
}

impl Side {
    pub fn tag_prefix(&self) -> &'static str {
        match self {
            Side::Entry => "buy",
            Side::Exit => "sell",
        }
    }

    pub fn enable_key(&self, id: u8) -> String {
        match self {
            Side::Entry => entry_enable_key(id),
            Side::Exit => exit_enable_key(id),
        }
    }

    pub fn tag(&self, id: u8) -> String {
        format!("{}_{}", self.tag_prefix(), id)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Entry => write!(f, "entry"),
            Side::Exit => write!(f, "exit"),
        }
    }
}

const OFFSET_SMA_ENTRY: &str = "BELOW(close, sma_offset_buy), BELOW(rsi, $buy_rsi_1), BELOW(mfi, $buy_mfi_1)";
const OFFSET_EMA_ENTRY: &str = "BELOW(close, ema_offset_buy), BELOW(rsi, $buy_rsi_1), BELOW(mfi, $buy_mfi_2)";
const VOLUME_SPIKE: &str = "ABOVE(volume, MUL(volume_mean_4, $buy_volume_2))";

/// Which template each entry group 1..=21 follows: `true` for the SMA/MFI-1
/// family, `false` for the EMA/MFI-2 family. Groups 1 and 2 omit the volume
/// condition.
const ENTRY_USES_SMA: [bool; ENTRY_GROUP_COUNT as usize] = [
    true, false, false, true, false, false, true, true, false, false, false, true, false, false,
    true, true, false, false, true, false, false,
];

/// Built-in expression of entry group `id`.
pub fn default_entry_expression(id: u8) -> Option<String> {
    let uses_sma = *ENTRY_USES_SMA.get(usize::from(id).checked_sub(1)?)?;
    let base = if uses_sma {
        OFFSET_SMA_ENTRY
    } else {
        OFFSET_EMA_ENTRY
    };
    Some(if id <= 2 {
        format!("AND({})", base)
    } else {
        format!("AND({}, {})", base, VOLUME_SPIKE)
    })
}

/// Built-in expression of exit group `id`.
pub fn default_exit_expression(id: u8) -> Option<String> {
    let text = match id {
        1 => "AND(ABOVE(close, sma_offset_sell), ABOVE(rsi, $sell_rsi_bb_1))",
        2 => "AND(ABOVE(close, ema_offset_sell), ABOVE(rsi, $sell_rsi_bb_2))",
        3 => "AND(ABOVE(close, ema_offset_sell), ABOVE(rsi, $sell_rsi_main_3))",
        4 => {
            "AND(ABOVE(close, ema_offset_sell), ABOVE(rsi, $sell_dual_rsi_rsi_4), \
             ABOVE(rsi_1h, $sell_dual_rsi_rsi_1h_4))"
        }
        5 => {
            "AND(ABOVE(close, ema_offset_sell), ABOVE(rsi, $sell_ema_relative_5), \
             ABOVE(rsi, $sell_rsi_diff_5))"
        }
        6 => "AND(ABOVE(close, sma_offset_sell), ABOVE(rsi, $sell_rsi_under_6))",
        7 => "AND(ABOVE(close, ema_offset_sell), ABOVE(rsi_1h, $sell_rsi_1h_7))",
        8 => "AND(ABOVE(close, sma_offset_sell), ABOVE(rsi, $sell_bb_relative_8))",
        _ => return None,
    };
    Some(text.to_string())
}

/// One toggleable predicate contributing to a side's OR-combined signal.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    pub id: u8,
    pub side: Side,
    pub enabled: bool,
    pub expression: String,
    /// `expression` with every parameter reference replaced by its value.
    pub predicate: Rule,
    columns: BTreeSet<String>,
    params: BTreeSet<String>,
}

impl RuleGroup {
    pub fn build(
        side: Side,
        id: u8,
        expression: &str,
        params: &ParameterBundle,
    ) -> Result<Self, MohoError> {
        let parsed = parse(expression)?;
        let predicate = parsed.bind(params)?;
        Ok(Self {
            id,
            side,
            enabled: params.flag(&side.enable_key(id))?,
            expression: expression.to_string(),
            columns: predicate.columns(),
            params: parsed.params(),
            predicate,
        })
    }

    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    /// Parameter keys the expression referenced before binding.
    pub fn params(&self) -> &BTreeSet<String> {
        &self.params
    }

    pub fn tag(&self) -> String {
        self.side.tag(self.id)
    }

    pub fn fires(&self, row: &Row<'_>) -> bool {
        self.enabled && evaluate(&self.predicate, row).fired()
    }
}

/// Both sides' groups, built once from a parameter bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    entry: Vec<RuleGroup>,
    exit: Vec<RuleGroup>,
    entry_required: BTreeSet<String>,
    exit_required: BTreeSet<String>,
}

impl RuleSet {
    pub fn from_params(params: &ParameterBundle) -> Result<Self, MohoError> {
        Self::with_overrides(params, &BTreeMap::new(), &BTreeMap::new())
    }

    /// Built-in groups with selected expressions replaced by id.
    pub fn with_overrides(
        params: &ParameterBundle,
        entry_overrides: &BTreeMap<u8, String>,
        exit_overrides: &BTreeMap<u8, String>,
    ) -> Result<Self, MohoError> {
        let entry = build_side(Side::Entry, ENTRY_GROUP_COUNT, params, entry_overrides)?;
        let exit = build_side(Side::Exit, EXIT_GROUP_COUNT, params, exit_overrides)?;
        Ok(Self {
            entry_required: enabled_columns(&entry),
            exit_required: enabled_columns(&exit),
            entry,
            exit,
        })
    }

    pub fn groups(&self, side: Side) -> &[RuleGroup] {
        match side {
            Side::Entry => &self.entry,
            Side::Exit => &self.exit,
        }
    }

    /// Columns read by the enabled groups of `side`.
    pub fn required_columns(&self, side: Side) -> &BTreeSet<String> {
        match side {
            Side::Entry => &self.entry_required,
            Side::Exit => &self.exit_required,
        }
    }

    /// Parameter keys referenced by any enabled group.
    pub fn referenced_params(&self) -> BTreeSet<&str> {
        self.entry
            .iter()
            .chain(&self.exit)
            .filter(|g| g.enabled)
            .flat_map(|g| g.params().iter().map(String::as_str))
            .collect()
    }

    /// Fail when an enabled group reads a column outside `available`.
    pub fn check_columns<'a, I>(&self, available: I) -> Result<(), MohoError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let available: BTreeSet<&str> = available.into_iter().collect();
        for group in self.entry.iter().chain(&self.exit).filter(|g| g.enabled) {
            if let Some(missing) = group
                .columns()
                .iter()
                .find(|c| !available.contains(c.as_str()))
            {
                return Err(MohoError::RuleInvalid {
                    reason: format!("{} reads unknown column {}", group.tag(), missing),
                });
            }
        }
        Ok(())
    }
}

fn enabled_columns(groups: &[RuleGroup]) -> BTreeSet<String> {
    groups
        .iter()
        .filter(|g| g.enabled)
        .flat_map(|g| g.columns().iter().cloned())
        .collect()
}

fn build_side(
    side: Side,
    count: u8,
    params: &ParameterBundle,
    overrides: &BTreeMap<u8, String>,
) -> Result<Vec<RuleGroup>, MohoError> {
    if let Some(id) = overrides.keys().find(|id| **id == 0 || **id > count) {
        return Err(MohoError::RuleInvalid {
            reason: format!("{} group {} does not exist (1..={})", side, id, count),
        });
    }

    (1..=count)
        .map(|id| {
            let expression = match overrides.get(&id) {
                Some(text) => {
                    warn!(group = %side.tag(id), expression = %text, "rule group overridden");
                    text.clone()
                }
                None => match side {
                    Side::Entry => default_entry_expression(id),
                    Side::Exit => default_exit_expression(id),
                }
                .ok_or_else(|| MohoError::RuleInvalid {
                    reason: format!("no built-in expression for {}", side.tag(id)),
                })?,
            };
            RuleGroup::build(side, id, &expression, params)
        })
        .collect()
}

/// Classification of one side for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideSignal {
    pub active: bool,
    pub tag: Option<String>,
    /// Ids of every group that fired, ascending.
    pub fired: Vec<u8>,
}

/// Entry and exit classification of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalRow {
    pub entry: SideSignal,
    pub exit: SideSignal,
}

/// A row may signal on `side` only after the startup window and once every
/// column read by an enabled group is defined.
pub fn is_eligible(rules: &RuleSet, side: Side, row: &Row<'_>, startup_candle_count: usize) -> bool {
    row.index() >= startup_candle_count
        && rules
            .required_columns(side)
            .iter()
            .all(|c| row.get(c).is_some())
}

pub fn classify(rules: &RuleSet, side: Side, row: &Row<'_>, startup_candle_count: usize) -> SideSignal {
    if !is_eligible(rules, side, row, startup_candle_count) {
        return SideSignal::default();
    }
    let fired: Vec<u8> = rules
        .groups(side)
        .iter()
        .filter(|g| g.fires(row))
        .map(|g| g.id)
        .collect();
    SideSignal {
        active: !fired.is_empty(),
        tag: fired.first().map(|id| side.tag(*id)),
        fired,
    }
}

/// Classify every row of a merged frame.
pub fn populate_signals(frame: &Frame, rules: &RuleSet, startup_candle_count: usize) -> Vec<SignalRow> {
    frame
        .rows()
        .map(|row| SignalRow {
            entry: classify(rules, Side::Entry, &row, startup_candle_count),
            exit: classify(rules, Side::Exit, &row, startup_candle_count),
        })
        .collect()
}
