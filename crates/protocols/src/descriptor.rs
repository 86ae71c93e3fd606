//! The static record of how to call a given protocol.

use alloy::primitives::{Address, TxHash};

use crate::{
    id::ProtocolId,
    shapes::{BalanceQuery, DepositShape, StatusCheck},
};

/// Describes one staking protocol.
///
/// Immutable once the registry is built, except for the contract address which configuration may
/// override through [`ProtocolDescriptor::with_contract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    id: ProtocolId,
    display_name: &'static str,
    contract: Address,
    reward_token: &'static str,
    explorer_tx_url: &'static str,
    deposit: DepositShape,
    balance: BalanceQuery,
    status_check: Option<StatusCheck>,
}

impl ProtocolDescriptor {
    /// Creates a new descriptor without a status check.
    pub fn new(
        id: ProtocolId,
        display_name: &'static str,
        contract: Address,
        reward_token: &'static str,
        explorer_tx_url: &'static str,
        deposit: DepositShape,
        balance: BalanceQuery,
    ) -> Self {
        Self {
            id,
            display_name,
            contract,
            reward_token,
            explorer_tx_url,
            deposit,
            balance,
            status_check: None,
        }
    }

    /// Adds a status check that must pass before every deposit.
    pub fn with_status_check(self, check: StatusCheck) -> Self {
        Self {
            status_check: Some(check),
            ..self
        }
    }

    /// Replaces the contract address.
    pub fn with_contract(self, contract: Address) -> Self {
        Self { contract, ..self }
    }

    /// The unique key of this protocol.
    pub fn id(&self) -> &ProtocolId {
        &self.id
    }

    /// Name used in reports.
    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    /// The staking contract.
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Display name of the token minted in exchange for the stake.
    pub fn reward_token(&self) -> &'static str {
        self.reward_token
    }

    /// The deposit call shape.
    pub fn deposit(&self) -> DepositShape {
        self.deposit
    }

    /// The balance query shape.
    pub fn balance(&self) -> BalanceQuery {
        self.balance
    }

    /// The optional availability precheck.
    pub fn status_check(&self) -> Option<StatusCheck> {
        self.status_check
    }

    /// Link to `tx_hash` on the block explorer.
    pub fn explorer_url(&self, tx_hash: &TxHash) -> String {
        format!("{}{tx_hash}", self.explorer_tx_url)
    }
}
