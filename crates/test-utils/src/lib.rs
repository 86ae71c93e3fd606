//! This crate provides test utilities shared by the staker crates.
//!
//! The main piece is [`chain::StubChain`], a scripted in-memory [`ChainClient`] that records every
//! estimate and submission so tests can assert on what the engine did (and did not) send.
//!
//! [`ChainClient`]: staker_chain::client::ChainClient

pub mod chain;
pub mod fixtures;
