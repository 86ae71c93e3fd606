//! Error types for sessions, protocols and scheduling.

use alloy::primitives::{TxHash, U256};
use thiserror::Error;

/// Why a single protocol's stake did not go through.
///
/// A failure only ever affects the protocol it was raised for, the session moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakeFailure {
    /// The status precheck reported the protocol as not accepting deposits.
    #[error("protocol unavailable: {0}")]
    ProtocolUnavailable(String),

    /// Every gas estimation attempt failed.
    #[error("gas estimation failed after {attempts} attempts: {last_error}")]
    EstimationFailed {
        /// Number of attempts made.
        attempts: u32,

        /// The error of the final attempt.
        last_error: String,
    },

    /// The fee data could not be read.
    #[error("fee lookup failed: {0}")]
    FeeLookupFailed(String),

    /// The resolved max fee is above the configured ceiling.
    #[error("max fee of {max_fee_per_gas} wei exceeds the cap of {cap} wei")]
    FeeTooHigh {
        /// The resolved max fee per gas.
        max_fee_per_gas: u128,

        /// The configured ceiling.
        cap: u128,
    },

    /// The transaction could not be signed or broadcast.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// The transaction was included but reverted.
    #[error("transaction {tx_hash} failed on chain")]
    TransactionFailed {
        /// The reverted transaction.
        tx_hash: TxHash,
    },

    /// The transaction was broadcast but its inclusion could not be observed.
    #[error("confirmation failed: {0}")]
    ConfirmationFailed(String),

    /// The stake amount cannot be encoded for this protocol.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl StakeFailure {
    /// A suggestion for the operator when the failure matches a well-known contract error.
    pub fn hint(&self) -> Option<&'static str> {
        let message = self.to_string();
        if message.contains("MaxTVLReached") {
            Some("the protocol has reached its deposit cap, try a smaller amount or retry later")
        } else if message.contains("ContractPaused") || message.contains("paused") {
            Some("deposits are paused on the contract, retry once the protocol resumes")
        } else if message.contains("insufficient funds") {
            Some("the account cannot cover value plus gas, top it up")
        } else {
            None
        }
    }
}

/// Why a whole session ended before any protocol was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionAbort {
    /// The node is on a different chain than configured.
    #[error("wrong network: expected chain id {expected}, connected to {actual}")]
    WrongNetwork {
        /// The configured chain id.
        expected: u64,

        /// The chain id reported by the node.
        actual: u64,
    },

    /// The account cannot cover one stake per enabled protocol.
    #[error("insufficient balance: required {required} wei, available {available} wei")]
    InsufficientBalance {
        /// Stake amount times the number of enabled protocols.
        required: U256,

        /// The account balance.
        available: U256,
    },

    /// A precondition could not be checked at all.
    #[error("precondition check failed: {0}")]
    PreconditionFailed(String),
}

impl SessionAbort {
    /// How much is missing, for [`SessionAbort::InsufficientBalance`].
    pub fn shortfall(&self) -> Option<U256> {
        match self {
            SessionAbort::InsufficientBalance {
                required,
                available,
            } => Some(required.saturating_sub(*available)),
            _ => None,
        }
    }
}

/// Errors raised while computing a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The number of sessions per day is out of range.
    #[error("staking frequency must be between 1 and 24 sessions per day, got {0}")]
    InvalidFrequency(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_match_known_revert_reasons() {
        let tvl = StakeFailure::EstimationFailed {
            attempts: 3,
            last_error: "execution reverted: MaxTVLReached()".to_string(),
        };
        assert!(tvl.hint().is_some_and(|h| h.contains("deposit cap")));

        let paused = StakeFailure::ProtocolUnavailable("paused".to_string());
        assert!(paused.hint().is_some_and(|h| h.contains("paused")));

        assert_eq!(StakeFailure::FeeLookupFailed("timeout".to_string()).hint(), None);
    }

    #[test]
    fn insufficient_balance_reports_shortfall() {
        let abort = SessionAbort::InsufficientBalance {
            required: U256::from(20u64),
            available: U256::from(15u64),
        };

        assert_eq!(abort.shortfall(), Some(U256::from(5u64)));
        assert_eq!(
            abort.to_string(),
            "insufficient balance: required 20 wei, available 15 wei"
        );
    }
}
