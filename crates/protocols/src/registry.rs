//! The fixed table of protocols the bot knows how to stake into.

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::{address, Address};
use tracing::debug;

use crate::{
    descriptor::ProtocolDescriptor,
    errors::RegistryError,
    id::ProtocolId,
    shapes::{BalanceQuery, DepositShape, StatusCheck},
};

/// Block explorer transaction prefix for Monad testnet.
pub const MONAD_TESTNET_EXPLORER: &str = "https://testnet.monadexplorer.com/tx/";

/// Kintsu staked-MON contract on Monad testnet.
pub const KINTSU_CONTRACT: Address = address!("e1d2439b75fb9746e7bc6cb777ae10aa7f7ef9c5");

/// Magma MON staking contract on Monad testnet.
pub const MAGMA_CONTRACT: Address = address!("2c9c959516e9aaedb2c748224a41249202ca8be7");

/// Apriori vault on Monad testnet.
pub const APRIORI_CONTRACT: Address = address!("b2f82d0f38dc453d596ad40a37799446cc89274a");

/// Referral id Magma deposits are tagged with (`0x8645b0`).
pub const MAGMA_REFERRAL_ID: u64 = 0x8645b0;

/// Maps protocol identifiers to their descriptors.
///
/// Building a registry has no side effects, nothing here touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRegistry {
    descriptors: BTreeMap<ProtocolId, ProtocolDescriptor>,
}

impl ProtocolRegistry {
    /// Creates a registry from the given descriptors.
    ///
    /// Fails if two descriptors share an identifier.
    pub fn new(
        descriptors: impl IntoIterator<Item = ProtocolDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for descriptor in descriptors {
            let id = descriptor.id().clone();
            if map.insert(id.clone(), descriptor).is_some() {
                return Err(RegistryError::DuplicateProtocol(id));
            }
        }

        Ok(Self { descriptors: map })
    }

    /// The protocols the bot ships with.
    pub fn builtin() -> Self {
        let descriptors = [
            ProtocolDescriptor::new(
                builtin_id("kintsu"),
                "Kintsu",
                KINTSU_CONTRACT,
                "Kintsu Shares",
                MONAD_TESTNET_EXPLORER,
                DepositShape::Uint96Assets,
                BalanceQuery::BalanceOf,
            ),
            ProtocolDescriptor::new(
                builtin_id("magma"),
                "Magma",
                MAGMA_CONTRACT,
                "gMON",
                MONAD_TESTNET_EXPLORER,
                DepositShape::Referral {
                    referral_id: MAGMA_REFERRAL_ID,
                },
                BalanceQuery::ShareToken,
            )
            .with_status_check(StatusCheck::NotPaused),
            ProtocolDescriptor::new(
                builtin_id("apriori"),
                "Apriori",
                APRIORI_CONTRACT,
                "sMON",
                MONAD_TESTNET_EXPLORER,
                DepositShape::Erc4626,
                BalanceQuery::MaxRedeem,
            ),
        ];

        Self {
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.id().clone(), d))
                .collect(),
        }
    }

    /// Points `id` at a different contract.
    pub fn with_contract_override(
        mut self,
        id: &ProtocolId,
        contract: Address,
    ) -> Result<Self, RegistryError> {
        let descriptor = self
            .descriptors
            .remove(id)
            .ok_or_else(|| self.unknown(id))?;

        debug!(%id, %contract, "overriding protocol contract");
        self.descriptors
            .insert(id.clone(), descriptor.with_contract(contract));

        Ok(self)
    }

    /// Looks up a single descriptor.
    pub fn get(&self, id: &ProtocolId) -> Option<&ProtocolDescriptor> {
        self.descriptors.get(id)
    }

    /// Iterates over all registered descriptors, ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolDescriptor> {
        self.descriptors.values()
    }

    /// Resolves the enabled identifiers to descriptors, keeping the given order.
    ///
    /// Every identifier is checked before anything is returned so that a single typo aborts the
    /// whole run instead of silently skipping one protocol.
    pub fn resolve(&self, enabled: &[ProtocolId]) -> Result<Vec<ProtocolDescriptor>, RegistryError> {
        if enabled.is_empty() {
            return Err(RegistryError::NoProtocolsEnabled);
        }

        let mut seen = BTreeSet::new();
        enabled
            .iter()
            .map(|id| {
                if !seen.insert(id) {
                    return Err(RegistryError::DuplicateProtocol(id.clone()));
                }

                self.get(id).cloned().ok_or_else(|| self.unknown(id))
            })
            .collect()
    }

    fn unknown(&self, id: &ProtocolId) -> RegistryError {
        RegistryError::UnknownProtocol {
            id: id.clone(),
            available: self
                .descriptors
                .keys()
                .map(ProtocolId::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn builtin_id(s: &str) -> ProtocolId {
    s.parse()
        .unwrap_or_else(|e| unreachable!("builtin protocol id {s} must be valid: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<ProtocolId> {
        list.iter().map(|s| s.parse().expect("valid id")).collect()
    }

    #[test]
    fn resolves_in_configured_order() {
        let registry = ProtocolRegistry::builtin();
        let resolved = registry
            .resolve(&ids(&["magma", "apriori", "kintsu"]))
            .expect("all known");

        let order: Vec<_> = resolved.iter().map(|d| d.id().as_str()).collect();
        assert_eq!(order, ["magma", "apriori", "kintsu"]);
    }

    #[test]
    fn unknown_protocol_fails_whole_resolution() {
        let registry = ProtocolRegistry::builtin();
        let err = registry
            .resolve(&ids(&["kintsu", "kintzu"]))
            .expect_err("typo must fail");

        match err {
            RegistryError::UnknownProtocol { id, available } => {
                assert_eq!(id.as_str(), "kintzu");
                assert_eq!(available, "apriori, kintsu, magma");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicates_and_empty_list() {
        let registry = ProtocolRegistry::builtin();
        assert_eq!(
            registry.resolve(&ids(&["magma", "magma"])),
            Err(RegistryError::DuplicateProtocol(
                "magma".parse().expect("valid id")
            ))
        );
        assert_eq!(registry.resolve(&[]), Err(RegistryError::NoProtocolsEnabled));
    }

    #[test]
    fn only_magma_has_a_status_check() {
        let registry = ProtocolRegistry::builtin();
        let with_check: Vec<_> = registry
            .iter()
            .filter(|d| d.status_check().is_some())
            .map(|d| d.id().as_str())
            .collect();
        assert_eq!(with_check, ["magma"]);
    }

    #[test]
    fn contract_override_replaces_address() {
        let id: ProtocolId = "apriori".parse().expect("valid id");
        let new_contract = Address::repeat_byte(0x11);
        let registry = ProtocolRegistry::builtin()
            .with_contract_override(&id, new_contract)
            .expect("known protocol");

        assert_eq!(registry.get(&id).map(|d| d.contract()), Some(new_contract));

        let unknown: ProtocolId = "lido".parse().expect("valid id");
        assert!(matches!(
            ProtocolRegistry::builtin().with_contract_override(&unknown, new_contract),
            Err(RegistryError::UnknownProtocol { .. })
        ));
    }

    #[test]
    fn new_rejects_duplicate_descriptors() {
        let kintsu = ProtocolRegistry::builtin()
            .get(&"kintsu".parse().expect("valid id"))
            .cloned()
            .expect("builtin");

        assert!(matches!(
            ProtocolRegistry::new([kintsu.clone(), kintsu]),
            Err(RegistryError::DuplicateProtocol(_))
        ));
    }
}
