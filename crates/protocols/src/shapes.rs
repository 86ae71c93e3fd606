//! The per-protocol capabilities: how to deposit, how to read the staked balance and how to tell
//! whether the protocol is accepting deposits.
//!
//! Each capability is a small tagged variant. Adding a protocol with an already-known call shape
//! is a registry entry, adding a new call shape is a new variant here.

use alloy::{
    primitives::{aliases::U96, Address, U256},
    sol_types::SolCall,
};
use staker_chain::{client::ChainClient, errors::ChainError, types::ContractCall};

use crate::{
    abi::{erc20, kintsu, magma, vault},
    errors::ProtocolError,
};

/// How a protocol's deposit call is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositShape {
    /// `deposit(uint256 assets, address receiver)`, payable with `assets` attached.
    Erc4626,

    /// `deposit(uint96 assets, address receiver)`, payable with `assets` attached.
    Uint96Assets,

    /// `depositMon(uint256 referralId)`, payable. Shares go to the sender.
    Referral {
        /// Referral id passed on every deposit.
        referral_id: u64,
    },
}

impl DepositShape {
    /// Encodes a deposit of `amount` wei into `contract`, crediting `receiver`.
    pub fn encode(
        &self,
        contract: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<ContractCall, ProtocolError> {
        let call = match self {
            DepositShape::Erc4626 => ContractCall::payable(
                contract,
                vault::depositCall {
                    assets: amount,
                    receiver,
                }
                .abi_encode(),
                amount,
                vault::depositCall::SIGNATURE,
            ),
            DepositShape::Uint96Assets => {
                let assets = u128::try_from(amount)
                    .ok()
                    .and_then(|a| U96::try_from(a).ok())
                    .ok_or(ProtocolError::AmountOutOfRange { amount, bits: 96 })?;

                ContractCall::payable(
                    contract,
                    kintsu::depositCall { assets, receiver }.abi_encode(),
                    amount,
                    kintsu::depositCall::SIGNATURE,
                )
            }
            DepositShape::Referral { referral_id } => ContractCall::payable(
                contract,
                magma::depositMonCall {
                    referralId: U256::from(*referral_id),
                }
                .abi_encode(),
                amount,
                magma::depositMonCall::SIGNATURE,
            ),
        };

        Ok(call)
    }
}

/// How to read back what the account holds in a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceQuery {
    /// `balanceOf(owner)` on the staking contract itself.
    BalanceOf,

    /// `maxRedeem(owner)` on an ERC-4626 vault.
    MaxRedeem,

    /// The staking contract exposes its share token through `gMON()`, the balance is
    /// `balanceOf(owner)` on that token.
    ShareToken,
}

impl BalanceQuery {
    /// Queries the staked balance of `owner` in `contract`.
    pub async fn query<C>(
        &self,
        chain: &C,
        contract: Address,
        owner: Address,
    ) -> Result<U256, ChainError>
    where
        C: ChainClient + ?Sized,
    {
        match self {
            BalanceQuery::BalanceOf => balance_of(chain, contract, owner).await,
            BalanceQuery::MaxRedeem => {
                let call = ContractCall::view(
                    contract,
                    vault::maxRedeemCall { owner }.abi_encode(),
                    vault::maxRedeemCall::SIGNATURE,
                );
                let data = chain.call(&call).await?;
                decode_returns::<vault::maxRedeemCall>(&data)
            }
            BalanceQuery::ShareToken => {
                let call = ContractCall::view(
                    contract,
                    magma::gMONCall {}.abi_encode(),
                    magma::gMONCall::SIGNATURE,
                );
                let data = chain.call(&call).await?;
                let token = decode_returns::<magma::gMONCall>(&data)?;
                balance_of(chain, token, owner).await
            }
        }
    }
}

fn decode_returns<T: SolCall>(data: &[u8]) -> Result<T::Return, ChainError> {
    T::abi_decode_returns(data).map_err(|e| ChainError::Decode {
        call: T::SIGNATURE,
        reason: e.to_string(),
    })
}

async fn balance_of<C>(chain: &C, token: Address, owner: Address) -> Result<U256, ChainError>
where
    C: ChainClient + ?Sized,
{
    let call = ContractCall::view(
        token,
        erc20::balanceOfCall { account: owner }.abi_encode(),
        erc20::balanceOfCall::SIGNATURE,
    );
    let data = chain.call(&call).await?;
    decode_returns::<erc20::balanceOfCall>(&data)
}

/// Whether a protocol currently accepts deposits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolStatus {
    /// Deposits are accepted.
    Available,

    /// Deposits would fail, with the reason reported by the contract.
    Unavailable(String),
}

/// A precheck run before estimating or submitting a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCheck {
    /// `paused()` must return `false`.
    NotPaused,
}

impl StatusCheck {
    /// Runs the check against `contract`.
    pub async fn check<C>(&self, chain: &C, contract: Address) -> Result<ProtocolStatus, ChainError>
    where
        C: ChainClient + ?Sized,
    {
        match self {
            StatusCheck::NotPaused => {
                let call = ContractCall::view(
                    contract,
                    magma::pausedCall {}.abi_encode(),
                    magma::pausedCall::SIGNATURE,
                );
                let data = chain.call(&call).await?;
                if decode_returns::<magma::pausedCall>(&data)? {
                    Ok(ProtocolStatus::Unavailable("paused".to_string()))
                } else {
                    Ok(ProtocolStatus::Available)
                }
            }
        }
    }
}
