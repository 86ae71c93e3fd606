//! Descriptors bound to a live chain connection.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use staker_chain::{client::ChainClient, errors::ChainError, types::ContractCall};
use tracing::trace;

use crate::{
    descriptor::ProtocolDescriptor, errors::ProtocolError, id::ProtocolId, shapes::ProtocolStatus,
};

/// A protocol descriptor together with the chain connection used to reach it.
///
/// Bindings are created once when the orchestrator starts and reused for the process lifetime.
#[derive(Debug)]
pub struct ContractBinding<C> {
    descriptor: ProtocolDescriptor,
    chain: Arc<C>,
}

impl<C> Clone for ContractBinding<C> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            chain: self.chain.clone(),
        }
    }
}

impl<C: ChainClient> ContractBinding<C> {
    /// Binds `descriptor` to `chain`.
    pub fn new(descriptor: ProtocolDescriptor, chain: Arc<C>) -> Self {
        Self { descriptor, chain }
    }

    /// Binds every descriptor to the same chain connection, keeping the order.
    pub fn bind_all(descriptors: Vec<ProtocolDescriptor>, chain: Arc<C>) -> Vec<Self> {
        descriptors
            .into_iter()
            .map(|descriptor| Self::new(descriptor, chain.clone()))
            .collect()
    }

    /// The underlying descriptor.
    pub fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    /// Shorthand for the descriptor's identifier.
    pub fn id(&self) -> &ProtocolId {
        self.descriptor.id()
    }

    /// The chain connection.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Runs the descriptor's status check. Protocols without one are always available.
    pub async fn check_status(&self) -> Result<ProtocolStatus, ChainError> {
        match self.descriptor.status_check() {
            Some(check) => {
                trace!(protocol = %self.id(), ?check, "running status check");
                check
                    .check(self.chain.as_ref(), self.descriptor.contract())
                    .await
            }
            None => Ok(ProtocolStatus::Available),
        }
    }

    /// Builds the deposit call for `amount` wei credited to `receiver`.
    pub fn deposit_call(
        &self,
        amount: U256,
        receiver: Address,
    ) -> Result<ContractCall, ProtocolError> {
        self.descriptor
            .deposit()
            .encode(self.descriptor.contract(), amount, receiver)
    }

    /// Reads what `owner` currently holds in this protocol, in reward-token units.
    pub async fn staked_balance(&self, owner: Address) -> Result<U256, ChainError> {
        self.descriptor
            .balance()
            .query(self.chain.as_ref(), self.descriptor.contract(), owner)
            .await
    }

    /// Explorer link for a transaction sent to this protocol.
    pub fn explorer_url(&self, tx_hash: &TxHash) -> String {
        self.descriptor.explorer_url(tx_hash)
    }
}
