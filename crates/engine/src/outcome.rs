//! The structured results produced by the engine.

use alloy::primitives::{TxHash, U256};
use staker_protocols::id::ProtocolId;
use tracing::{info, warn};

use crate::{
    errors::{SessionAbort, StakeFailure},
    gas::GasEstimate,
};

/// The fee parameters a transaction is submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParams {
    /// Max fee per gas, in wei.
    pub max_fee_per_gas: u128,

    /// Max priority fee per gas, in wei.
    pub max_priority_fee_per_gas: u128,

    /// Whether the max fee came from the network rather than the fallback.
    pub max_fee_from_network: bool,

    /// Whether the priority fee came from the network rather than the fallback.
    pub priority_fee_from_network: bool,
}

/// The result of one protocol's stake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeOutcome {
    /// The deposit was included and succeeded.
    Success {
        /// The protocol staked into.
        protocol: ProtocolId,

        /// The deposit transaction.
        tx_hash: TxHash,

        /// Gas actually used.
        gas_used: u64,

        /// Block the transaction was included in.
        block_number: Option<u64>,

        /// Explorer link to the transaction.
        explorer_url: String,

        /// The estimate the gas limit was derived from.
        estimate: GasEstimate,
    },

    /// The stake did not go through.
    Failure {
        /// The protocol attempted.
        protocol: ProtocolId,

        /// Why it failed.
        reason: StakeFailure,
    },
}

impl StakeOutcome {
    /// The protocol this outcome belongs to.
    pub fn protocol(&self) -> &ProtocolId {
        match self {
            StakeOutcome::Success { protocol, .. } | StakeOutcome::Failure { protocol, .. } => {
                protocol
            }
        }
    }

    /// Whether the stake went through.
    pub fn is_success(&self) -> bool {
        matches!(self, StakeOutcome::Success { .. })
    }

    /// The failure reason, if any.
    pub fn reason(&self) -> Option<&StakeFailure> {
        match self {
            StakeOutcome::Success { .. } => None,
            StakeOutcome::Failure { reason, .. } => Some(reason),
        }
    }

    /// Gas used, zero for failures.
    pub fn gas_used(&self) -> u64 {
        match self {
            StakeOutcome::Success { gas_used, .. } => *gas_used,
            StakeOutcome::Failure { .. } => 0,
        }
    }
}

/// What an account holds in a protocol after a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolBalance {
    /// The protocol queried.
    pub protocol: ProtocolId,

    /// The token the balance is denominated in.
    pub reward_token: &'static str,

    /// The balance, `None` when the query failed.
    pub balance: Option<U256>,
}

/// The aggregate result of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    /// Stake amount per protocol, in wei.
    pub amount: U256,

    /// One outcome per attempted protocol, in configured order.
    pub outcomes: Vec<StakeOutcome>,

    /// Set when the session ended before any protocol was attempted.
    pub abort: Option<SessionAbort>,

    /// Best-effort balances after the session.
    pub balances: Vec<ProtocolBalance>,
}

impl SessionResult {
    /// A session that never got past its preconditions.
    pub fn aborted(amount: U256, abort: SessionAbort) -> Self {
        Self {
            amount,
            outcomes: Vec::new(),
            abort: Some(abort),
            balances: Vec::new(),
        }
    }

    /// Whether the preconditions failed.
    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    /// Number of successful stakes.
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of protocols attempted.
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Gas used across all successful stakes.
    pub fn total_gas_used(&self) -> u64 {
        self.outcomes
            .iter()
            .map(StakeOutcome::gas_used)
            .fold(0u64, u64::saturating_add)
    }

    /// Total value staked, in wei.
    pub fn total_staked(&self) -> U256 {
        self.amount.saturating_mul(U256::from(self.successes()))
    }

    /// Logs the result through `tracing`.
    pub fn log(&self) {
        if let Some(abort) = &self.abort {
            warn!(%abort, shortfall = ?abort.shortfall(), "session aborted");
            return;
        }

        for outcome in &self.outcomes {
            match outcome {
                StakeOutcome::Success {
                    protocol,
                    tx_hash,
                    gas_used,
                    explorer_url,
                    ..
                } => info!(%protocol, %tx_hash, gas_used, %explorer_url, "staked"),
                StakeOutcome::Failure { protocol, reason } => {
                    warn!(%protocol, %reason, hint = reason.hint(), "stake failed")
                }
            }
        }

        for balance in &self.balances {
            match balance.balance {
                Some(amount) => info!(protocol = %balance.protocol, %amount, token = balance.reward_token, "balance"),
                None => warn!(protocol = %balance.protocol, "balance unavailable"),
            }
        }

        info!(
            successes = self.successes(),
            attempted = self.attempted(),
            total_gas_used = self.total_gas_used(),
            total_staked = %self.total_staked(),
            "session finished"
        );
    }
}

/// What a deposit would look like, without sending it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreflightReport {
    /// The buffered gas estimate.
    pub estimate: GasEstimate,

    /// The resolved fees.
    pub fees: FeeParams,
}

impl PreflightReport {
    /// Upper bound on the fee the deposit may cost, in wei.
    pub fn max_cost(&self) -> U256 {
        U256::from(self.estimate.gas_limit).saturating_mul(U256::from(self.fees.max_fee_per_gas))
    }
}

/// One protocol's dry-run result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolCheck {
    /// The protocol checked.
    pub protocol: ProtocolId,

    /// The preflight report, or why it could not be produced.
    pub result: Result<PreflightReport, StakeFailure>,
}

/// The result of a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunReport {
    /// Set when the session preconditions failed.
    pub abort: Option<SessionAbort>,

    /// One check per enabled protocol, in configured order.
    pub checks: Vec<ProtocolCheck>,

    /// Current balances.
    pub balances: Vec<ProtocolBalance>,
}

impl DryRunReport {
    /// Whether a real session would have attempted every protocol.
    pub fn passed(&self) -> bool {
        self.abort.is_none() && self.checks.iter().all(|check| check.result.is_ok())
    }

    /// Logs the report through `tracing`.
    pub fn log(&self) {
        if let Some(abort) = &self.abort {
            warn!(%abort, "dry run: preconditions failed");
            return;
        }

        for check in &self.checks {
            match &check.result {
                Ok(report) => info!(
                    protocol = %check.protocol,
                    gas_limit = report.estimate.gas_limit,
                    buffer = report.estimate.multiplier(),
                    max_fee_per_gas = report.fees.max_fee_per_gas,
                    max_priority_fee_per_gas = report.fees.max_priority_fee_per_gas,
                    fallback_fees = !(report.fees.max_fee_from_network && report.fees.priority_fee_from_network),
                    max_cost = %report.max_cost(),
                    "dry run: ready"
                ),
                Err(reason) => warn!(protocol = %check.protocol, %reason, hint = reason.hint(), "dry run: would fail"),
            }
        }

        for balance in &self.balances {
            if let Some(amount) = balance.balance {
                info!(protocol = %balance.protocol, %amount, token = balance.reward_token, "balance");
            }
        }

        info!(passed = self.passed(), "dry run finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ProtocolId {
        s.parse().expect("valid id")
    }

    #[test]
    fn aggregates_count_successes_only() {
        let estimate = GasEstimate {
            raw: 100,
            buffer_bps: 12_000,
            gas_limit: 120,
            attempt: 1,
        };
        let result = SessionResult {
            amount: U256::from(10u64),
            outcomes: vec![
                StakeOutcome::Success {
                    protocol: id("a"),
                    tx_hash: TxHash::with_last_byte(1),
                    gas_used: 90,
                    block_number: Some(7),
                    explorer_url: String::new(),
                    estimate,
                },
                StakeOutcome::Failure {
                    protocol: id("b"),
                    reason: StakeFailure::ProtocolUnavailable("paused".to_string()),
                },
            ],
            abort: None,
            balances: Vec::new(),
        };

        assert_eq!(result.successes(), 1);
        assert_eq!(result.attempted(), 2);
        assert_eq!(result.total_gas_used(), 90);
        assert_eq!(result.total_staked(), U256::from(10u64));
    }

    #[test]
    fn total_gas_used_saturates() {
        let success = |protocol: &str, gas_used| StakeOutcome::Success {
            protocol: id(protocol),
            tx_hash: TxHash::with_last_byte(1),
            gas_used,
            block_number: None,
            explorer_url: String::new(),
            estimate: GasEstimate {
                raw: gas_used,
                buffer_bps: 12_000,
                gas_limit: gas_used,
                attempt: 1,
            },
        };
        let result = SessionResult {
            amount: U256::from(1u64),
            outcomes: vec![success("a", u64::MAX - 1), success("b", 5)],
            abort: None,
            balances: Vec::new(),
        };

        assert_eq!(result.total_gas_used(), u64::MAX);
    }
}
