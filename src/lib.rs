//! moho: signal-evaluation core of an offset-moving-average dip-buying
//! strategy.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], the command-line driver in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
