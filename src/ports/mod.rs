//! Port traits the domain core is driven through.

pub mod candle_port;
pub mod config_port;
