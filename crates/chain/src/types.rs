//! Plain value types exchanged across the [`ChainClient`](crate::client::ChainClient) boundary.

use std::fmt;

use alloy::primitives::{Address, Bytes, TxHash, U256};

/// A fully encoded call against a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// The contract being called.
    pub to: Address,

    /// ABI-encoded calldata.
    pub input: Bytes,

    /// Native value attached to the call, in wei.
    pub value: U256,

    /// Human-readable function signature, only used for logs and errors.
    pub signature: &'static str,
}

impl ContractCall {
    /// Creates a read-only call that carries no value.
    pub fn view(to: Address, input: impl Into<Bytes>, signature: &'static str) -> Self {
        Self {
            to,
            input: input.into(),
            value: U256::ZERO,
            signature,
        }
    }

    /// Creates a payable call that transfers `value` along with the calldata.
    pub fn payable(
        to: Address,
        input: impl Into<Bytes>,
        value: U256,
        signature: &'static str,
    ) -> Self {
        Self {
            to,
            input: input.into(),
            value,
            signature,
        }
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.signature, self.to)
    }
}

/// Gas and fee parameters attached to a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    /// Gas limit, already buffered.
    pub gas_limit: u64,

    /// EIP-1559 max fee per gas in wei.
    pub max_fee_per_gas: u128,

    /// EIP-1559 max priority fee per gas in wei.
    pub max_priority_fee_per_gas: u128,
}

/// Dynamic fee data as reported by the network.
///
/// Either field may be missing, some test networks do not report dynamic fees at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    /// Suggested max fee per gas in wei.
    pub max_fee_per_gas: Option<u128>,

    /// Suggested max priority fee per gas in wei.
    pub max_priority_fee_per_gas: Option<u128>,
}

/// The subset of a transaction receipt the engine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Hash of the included transaction.
    pub tx_hash: TxHash,

    /// Whether execution succeeded (status code `1`).
    pub success: bool,

    /// Gas consumed by the transaction.
    pub gas_used: u64,

    /// Block the transaction was included in, if the node reported it.
    pub block_number: Option<u64>,

    /// Number of logs emitted.
    pub log_count: usize,
}
