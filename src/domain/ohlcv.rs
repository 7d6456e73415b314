//! OHLCV candle representation and timeframe arithmetic.

use crate::domain::error::MohoError;
use chrono::{DateTime, Duration, NaiveDateTime};
use std::fmt;

/// One OHLCV record. `timestamp` is the candle's open time (UTC).
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// (high + low) / 2
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Longest accepted timeframe: one year.
pub const MAX_TIMEFRAME_MINUTES: i64 = 366 * 1440;

/// A fixed candle duration such as `5m` or `1h`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeframe {
    label: String,
    minutes: i64,
}

impl Timeframe {
    pub fn parse(input: &str) -> Result<Self, MohoError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| MohoError::InvalidParameter {
            key: "timeframe".to_string(),
            reason: format!("'{}': {}", trimmed, reason),
        };

        if trimmed.len() < 2 || !trimmed.is_ascii() {
            return Err(invalid("expected <count><unit>, e.g. 5m"));
        }
        let (count, unit) = trimmed.split_at(trimmed.len() - 1);
        let count: i64 = count.parse().map_err(|_| invalid("count is not an integer"))?;
        if count <= 0 {
            return Err(invalid("count must be positive"));
        }
        let unit_minutes = match unit {
            "m" => 1,
            "h" => 60,
            "d" => 1440,
            "w" => 10_080,
            _ => return Err(invalid("unit must be one of m, h, d, w")),
        };

        let minutes = count
            .checked_mul(unit_minutes)
            .filter(|m| *m <= MAX_TIMEFRAME_MINUTES)
            .ok_or_else(|| invalid("longer than one year"))?;

        Ok(Self {
            label: format!("{}{}", count, unit),
            minutes,
        })
    }

    /// `count` minutes; labelled `<count>m`.
    pub fn from_minutes(count: u32) -> Self {
        Self {
            label: format!("{}m", count),
            minutes: i64::from(count.max(1)),
        }
    }

    /// `count` hours; labelled `<count>h`.
    pub fn from_hours(count: u32) -> Self {
        Self {
            label: format!("{}h", count),
            minutes: i64::from(count.max(1)) * 60,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes)
    }

    /// How many candles of `self` fit into one candle of `coarser`, if whole.
    pub fn ratio_to(&self, coarser: &Timeframe) -> Option<i64> {
        if coarser.minutes >= self.minutes && coarser.minutes % self.minutes == 0 {
            Some(coarser.minutes / self.minutes)
        } else {
            None
        }
    }

    /// Start of the bucket of this timeframe containing `ts`.
    pub fn floor(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let step = self.minutes * 60;
        let secs = ts.and_utc().timestamp();
        let floored = secs - secs.rem_euclid(step);
        DateTime::from_timestamp(floored, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(ts)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Check ordering and spacing of a candle sequence.
pub fn validate_sequence(candles: &[Candle], timeframe: &Timeframe) -> Result<(), MohoError> {
    if let Some(first) = candles.first() {
        if timeframe.floor(first.timestamp) != first.timestamp {
            return Err(MohoError::Data {
                reason: format!(
                    "first candle at {} is off the {} grid",
                    first.timestamp, timeframe
                ),
            });
        }
    }
    let step = timeframe.minutes() * 60;
    for pair in candles.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(MohoError::Data {
                reason: format!(
                    "candle timestamps not strictly increasing at {}",
                    pair[1].timestamp
                ),
            });
        }
        let gap = pair[1].timestamp - pair[0].timestamp;
        if gap.num_seconds() % step != 0 {
            return Err(MohoError::Data {
                reason: format!(
                    "candle at {} is off the {} grid",
                    pair[1].timestamp, timeframe
                ),
            });
        }
    }
    Ok(())
}

/// Aggregate `from`-step candles into fully closed `to`-step candles.
///
/// Buckets missing any constituent candle are dropped, so a partially formed
/// trailing candle never appears in the output.
pub fn resample(
    candles: &[Candle],
    from: &Timeframe,
    to: &Timeframe,
) -> Result<Vec<Candle>, MohoError> {
    let per_bucket = from
        .ratio_to(to)
        .ok_or_else(|| MohoError::MisalignedTimeframes {
            primary: from.label().to_string(),
            informative: to.label().to_string(),
        })? as usize;

    let mut out = Vec::new();
    let mut bucket: Vec<&Candle> = Vec::with_capacity(per_bucket);
    let mut bucket_start: Option<NaiveDateTime> = None;

    for candle in candles {
        let start = to.floor(candle.timestamp);
        match bucket_start {
            Some(current) if current == start => {}
            Some(current) => {
                out.extend(close_bucket(current, &bucket, per_bucket));
                bucket.clear();
                bucket_start = Some(start);
            }
            None => bucket_start = Some(start),
        }
        bucket.push(candle);
    }
    if let Some(current) = bucket_start {
        out.extend(close_bucket(current, &bucket, per_bucket));
    }

    Ok(out)
}

fn close_bucket(start: NaiveDateTime, bucket: &[&Candle], per_bucket: usize) -> Option<Candle> {
    if bucket.len() != per_bucket {
        return None;
    }
    Some(Candle {
        timestamp: start,
        open: bucket[0].open,
        high: bucket.iter().map(|c| c.high).fold(f64::MIN, f64::max),
        low: bucket.iter().map(|c| c.low).fold(f64::MAX, f64::min),
        close: bucket[bucket.len() - 1].close,
        volume: bucket.iter().map(|c| c.volume).sum(),
    })
}
