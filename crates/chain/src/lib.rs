//! # `staker-chain`
//!
//! The boundary between the staking engine and the chain it stakes on.
//!
//! The engine only ever talks to the [`ChainClient`](client::ChainClient) trait. The
//! [`RpcChainClient`](rpc::RpcChainClient) implements it over an alloy JSON-RPC HTTP provider that
//! signs with the configured [`Account`](account::Account).

pub mod account;
pub mod client;
pub mod errors;
pub mod rpc;
pub mod types;

pub use alloy::primitives::{Address, Bytes, TxHash, U256};
