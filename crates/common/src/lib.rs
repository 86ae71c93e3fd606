//! Reusable utilities shared by the staker binaries and crates.
//!
//! For now this is the logging/tracing setup. Everything that prints anything goes through
//! [`tracing`], which is re-exported here for convenience.

pub mod logging;

pub use tracing;
