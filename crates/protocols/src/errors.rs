//! Error types for protocol resolution and call encoding.

use alloy::primitives::U256;
use thiserror::Error;

use crate::id::ProtocolId;

/// Errors raised while turning configured identifiers into descriptors.
///
/// All of these are startup errors: they are checked before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No descriptor is registered under this identifier.
    #[error("unknown protocol {id} (available: {available})")]
    UnknownProtocol {
        /// The identifier that did not resolve.
        id: ProtocolId,

        /// Comma-separated list of known identifiers.
        available: String,
    },

    /// The same protocol was enabled twice.
    #[error("protocol {0} is enabled more than once")]
    DuplicateProtocol(ProtocolId),

    /// The enabled list is empty.
    #[error("no protocols enabled")]
    NoProtocolsEnabled,

    /// An identifier is not well formed.
    #[error("invalid protocol identifier {0:?}")]
    InvalidIdentifier(String),
}

/// Errors raised while encoding a protocol call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The amount does not fit the integer width the contract takes.
    #[error("amount {amount} does not fit in uint{bits}")]
    AmountOutOfRange {
        /// The offending amount, in wei.
        amount: U256,

        /// Width of the contract parameter.
        bits: usize,
    },
}
