//! One-pair pipeline: indicators, informative merge, signal classification.
//!
//! Stateless and deterministic: the same candles and strategy always
//! produce a bit-identical analyzed frame.

use crate::domain::catalog::{compute_informative, compute_primary};
use crate::domain::error::MohoError;
use crate::domain::frame::{Frame, Row};
use crate::domain::merge::{MergePolicy, merge_informative};
use crate::domain::ohlcv::{Candle, resample, validate_sequence};
use crate::domain::signal::{SignalRow, populate_signals};
use crate::domain::strategy::Strategy;
use tracing::{debug, info};

/// Merged indicator frame plus the per-row entry/exit classification.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedFrame {
    frame: Frame,
    signals: Vec<SignalRow>,
}

impl AnalyzedFrame {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn signals(&self) -> &[SignalRow] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<(Row<'_>, &SignalRow)> {
        Some((self.frame.row(index)?, self.signals.get(index)?))
    }

    /// Latest analyzed row, the one exit decisions are taken against.
    pub fn last_row(&self) -> Option<Row<'_>> {
        self.frame.last_row()
    }

    pub fn last_signal(&self) -> Option<&SignalRow> {
        self.signals.last()
    }

    pub fn entry_count(&self) -> usize {
        self.signals.iter().filter(|s| s.entry.active).count()
    }

    pub fn exit_count(&self) -> usize {
        self.signals.iter().filter(|s| s.exit.active).count()
    }
}

/// Analyze one pair from primary and informative candles.
pub fn analyze(
    strategy: &Strategy,
    primary: &[Candle],
    informative: &[Candle],
) -> Result<AnalyzedFrame, MohoError> {
    let settings = &strategy.settings;
    validate_sequence(primary, &settings.timeframe)?;
    validate_sequence(informative, &settings.informative_timeframe)?;

    let primary_frame = compute_primary(primary, &settings.timeframe, &strategy.params)?;
    let informative_frame = compute_informative(informative, &settings.informative_timeframe)?;
    let merged = merge_informative(
        &primary_frame,
        &settings.timeframe,
        &informative_frame,
        &settings.informative_timeframe,
        &MergePolicy::for_timeframe(&settings.informative_timeframe),
    )?;
    debug!(
        rows = merged.len(),
        columns = merged.column_names().count(),
        "merged informative frame"
    );

    let signals = populate_signals(&merged, &strategy.rules, settings.startup_candle_count);
    let analyzed = AnalyzedFrame {
        frame: merged,
        signals,
    };
    info!(
        rows = analyzed.len(),
        entries = analyzed.entry_count(),
        exits = analyzed.exit_count(),
        "analysis complete"
    );
    Ok(analyzed)
}

/// Analyze one pair when only primary candles are available; the informative
/// candles are built by resampling.
pub fn analyze_resampled(strategy: &Strategy, primary: &[Candle]) -> Result<AnalyzedFrame, MohoError> {
    let informative = resample(
        primary,
        &strategy.settings.timeframe,
        &strategy.settings.informative_timeframe,
    )?;
    debug!(
        primary = primary.len(),
        informative = informative.len(),
        "resampled informative candles"
    );
    analyze(strategy, primary, &informative)
}
