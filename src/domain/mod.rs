//! Core domain types and logic.

pub mod ohlcv;
pub mod frame;
pub mod indicator;
pub mod catalog;
pub mod merge;
pub mod params;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod signal;
pub mod position;
pub mod exit_policy;
pub mod settings;
pub mod strategy;
pub mod pipeline;
pub mod config_validation;
pub mod error;
