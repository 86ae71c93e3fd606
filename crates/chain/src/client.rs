//! The capability surface the staking engine needs from a chain connection.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use crate::{
    errors::ChainError,
    types::{ContractCall, FeeData, TxOptions, TxReceipt},
};

/// Everything the engine is allowed to ask of the chain.
///
/// Implementations own transport concerns, including per-call timeouts. The engine assumes every
/// call eventually resolves or rejects.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Returns the chain id reported by the node.
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Returns the native balance of `address` in wei.
    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    /// Returns the current dynamic fee suggestion.
    async fn fee_data(&self) -> Result<FeeData, ChainError>;

    /// Executes a read-only call and returns the raw return data.
    async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError>;

    /// Estimates the gas `from` would need to execute `call`.
    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<u64, ChainError>;

    /// Signs and broadcasts `call` from `from`, returning the transaction hash.
    async fn submit(
        &self,
        from: Address,
        call: &ContractCall,
        options: &TxOptions,
    ) -> Result<TxHash, ChainError>;

    /// Waits until `tx_hash` is included and returns its receipt.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError>;
}
