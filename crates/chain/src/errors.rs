//! Error types for the chain boundary.

use std::time::Duration;

use alloy::{primitives::TxHash, transports::TransportError};
use thiserror::Error;

/// Errors produced while talking to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The JSON-RPC request failed, either in transport or with an error response.
    #[error("rpc request failed: {0}")]
    Rpc(String),

    /// The return data of a read-only call did not have the expected shape.
    #[error("could not decode return data of {call}: {reason}")]
    Decode {
        /// The function whose return value could not be decoded.
        call: &'static str,

        /// What was wrong with the data.
        reason: String,
    },

    /// The transaction was broadcast but no receipt showed up in time.
    #[error("transaction {0} was not confirmed within {1:?}")]
    ConfirmationTimeout(TxHash, Duration),

    /// The RPC endpoint is not a valid URL.
    #[error("invalid rpc url {0}")]
    InvalidUrl(String),

    /// The signing key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        ChainError::Rpc(err.to_string())
    }
}
