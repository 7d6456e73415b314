//! Informative-timeframe merge.
//!
//! Attaches the most recent fully closed informative row to every primary
//! row. With primary open time `T`, primary step `p`, informative open time
//! `D` and informative step `q`, row `D` is visible from `T` once
//! `D + q <= T + p`: the informative candle closed no later than the primary
//! candle did. Values are carried forward until the next informative candle
//! closes, and are undefined before the first one does.

use crate::domain::error::MohoError;
use crate::domain::frame::Frame;
use crate::domain::ohlcv::Timeframe;

/// How informative columns are named and which ones are carried over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    pub suffix: String,
    pub columns: Option<Vec<String>>,
}

impl MergePolicy {
    /// Every informative column, suffixed with the timeframe label.
    pub fn for_timeframe(informative: &Timeframe) -> Self {
        Self {
            suffix: informative.label().to_string(),
            columns: None,
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn merged_name(&self, column: &str) -> String {
        format!("{}_{}", column, self.suffix)
    }
}

/// For each primary row, the index of the informative row visible from it.
pub fn alignment(
    primary: &Frame,
    primary_tf: &Timeframe,
    informative: &Frame,
    informative_tf: &Timeframe,
) -> Result<Vec<Option<usize>>, MohoError> {
    if primary_tf.ratio_to(informative_tf).is_none() {
        return Err(MohoError::MisalignedTimeframes {
            primary: primary_tf.label().to_string(),
            informative: informative_tf.label().to_string(),
        });
    }

    let p = primary_tf.duration();
    let q = informative_tf.duration();
    let inf_ts = informative.timestamps();

    let mut out = Vec::with_capacity(primary.len());
    let mut next = 0usize;
    for &t in primary.timestamps() {
        let primary_close = t + p;
        while next < inf_ts.len() && inf_ts[next] + q <= primary_close {
            next += 1;
        }
        out.push(next.checked_sub(1));
    }
    Ok(out)
}

/// Pure merge of `informative` onto `primary`; the inputs are not modified.
pub fn merge_informative(
    primary: &Frame,
    primary_tf: &Timeframe,
    informative: &Frame,
    informative_tf: &Timeframe,
    policy: &MergePolicy,
) -> Result<Frame, MohoError> {
    let aligned = alignment(primary, primary_tf, informative, informative_tf)?;

    let selected: Vec<String> = match &policy.columns {
        Some(cols) => {
            for c in cols {
                if !informative.contains(c) {
                    return Err(MohoError::Data {
                        reason: format!("informative frame has no column {}", c),
                    });
                }
            }
            cols.clone()
        }
        None => informative.column_names().map(str::to_string).collect(),
    };

    let mut merged = primary.clone();
    for name in selected {
        let target = policy.merged_name(&name);
        if merged.contains(&target) {
            return Err(MohoError::Data {
                reason: format!("merged column {} already exists", target),
            });
        }
        let source = informative.column(&name).unwrap_or(&[]);
        let values = aligned
            .iter()
            .map(|idx| idx.and_then(|j| source.get(j).copied()).unwrap_or(f64::NAN))
            .collect();
        merged.insert(target, values)?;
    }
    Ok(merged)
}
