//! Helpers for building bindings and orchestrators over a [`StubChain`].

use std::sync::Arc;

use alloy::primitives::{address, Address, U256};
use staker_protocols::{
    binding::ContractBinding,
    descriptor::ProtocolDescriptor,
    registry::{ProtocolRegistry, MONAD_TESTNET_EXPLORER},
    shapes::{BalanceQuery, DepositShape},
};
use staker_test_utils::{chain::StubChain, fixtures::TEST_CHAIN_ID};

use crate::{config::SessionConfig, session::SessionOrchestrator};

/// The account every test stakes from.
pub(crate) const STAKER: Address = address!("00000000000000000000000000000000000000aa");

/// A vault-style protocol at `contract` with no status check.
pub(crate) fn erc4626_descriptor(id: &str, contract: Address) -> ProtocolDescriptor {
    ProtocolDescriptor::new(
        id.parse().expect("valid id"),
        "Test Vault",
        contract,
        "tVAULT",
        MONAD_TESTNET_EXPLORER,
        DepositShape::Erc4626,
        BalanceQuery::BalanceOf,
    )
}

/// Binds [`erc4626_descriptor`] to `chain`.
pub(crate) fn erc4626_binding(
    chain: Arc<StubChain>,
    id: &str,
    contract: Address,
) -> ContractBinding<StubChain> {
    ContractBinding::new(erc4626_descriptor(id, contract), chain)
}

/// Binds one of the builtin protocols to `chain`.
pub(crate) fn builtin_binding(chain: Arc<StubChain>, id: &str) -> ContractBinding<StubChain> {
    let descriptor = ProtocolRegistry::builtin()
        .get(&id.parse().expect("valid id"))
        .cloned()
        .expect("builtin protocol");
    ContractBinding::new(descriptor, chain)
}

/// `n` vault protocols named `p0..pn` at distinct addresses.
pub(crate) fn vaults(n: usize) -> Vec<ProtocolDescriptor> {
    (0..n)
        .map(|i| {
            let contract = Address::with_last_byte(0xc0 + i as u8);
            erc4626_descriptor(&format!("p{i}"), contract)
        })
        .collect()
}

/// An orchestrator staking `amount` wei per protocol on the stub's chain.
pub(crate) fn orchestrator(
    chain: Arc<StubChain>,
    descriptors: Vec<ProtocolDescriptor>,
    amount: u64,
) -> SessionOrchestrator<StubChain> {
    SessionOrchestrator::new(
        chain,
        descriptors,
        STAKER,
        SessionConfig::new(TEST_CHAIN_ID, U256::from(amount)),
    )
}
