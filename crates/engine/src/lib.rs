//! # `staker-engine`
//!
//! Runs staking sessions against the protocols in a
//! [`ProtocolRegistry`](staker_protocols::registry::ProtocolRegistry).
//!
//! The pieces, from the bottom up:
//!
//! - [`gas`]: the gas estimation retry policy, as a pure state machine plus the async driver.
//! - [`executor`]: one protocol, one deposit. Never fails, every error becomes an outcome.
//! - [`session`]: preconditions, then every enabled protocol in order, then a balance report.
//! - [`schedule`] and [`scheduler`]: when sessions run.

pub mod config;
pub mod errors;
pub mod executor;
pub mod gas;
pub mod outcome;
pub mod schedule;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod testing;
