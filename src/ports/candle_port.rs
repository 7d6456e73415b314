//! Candle source port trait.

use crate::domain::error::MohoError;
use crate::domain::ohlcv::{Candle, Timeframe};

pub trait CandlePort {
    /// All stored candles of `pair` at `timeframe`, oldest first.
    fn fetch_candles(&self, pair: &str, timeframe: &Timeframe) -> Result<Vec<Candle>, MohoError>;

    fn has_candles(&self, pair: &str, timeframe: &Timeframe) -> bool;
}
