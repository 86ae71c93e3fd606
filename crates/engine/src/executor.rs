//! Stakes into a single protocol.

use alloy::primitives::{Address, U256};
use staker_chain::{
    client::ChainClient,
    types::{ContractCall, TxOptions},
};
use staker_protocols::{binding::ContractBinding, shapes::ProtocolStatus};
use tracing::{debug, info, warn};

use crate::{
    config::{FeeConfig, GasConfig},
    errors::StakeFailure,
    gas::{GasEstimate, GasEstimator},
    outcome::{FeeParams, PreflightReport, StakeOutcome},
};

/// Runs the deposit pipeline for one protocol: status check, gas estimation, fee lookup,
/// submission and confirmation.
///
/// Only estimation is retried. Once a transaction is broadcast it is never sent again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeExecutor {
    gas: GasEstimator,
    fees: FeeConfig,
}

impl StakeExecutor {
    /// Creates an executor with the given gas and fee policies.
    pub const fn new(gas: GasConfig, fees: FeeConfig) -> Self {
        Self {
            gas: GasEstimator::new(gas),
            fees,
        }
    }

    /// Stakes `amount` wei from `staker` into `binding`'s protocol.
    pub async fn run<C: ChainClient>(
        &self,
        binding: &ContractBinding<C>,
        amount: U256,
        staker: Address,
    ) -> StakeOutcome {
        match self.execute(binding, amount, staker).await {
            Ok(outcome) => outcome,
            Err(reason) => {
                warn!(protocol = %binding.id(), %reason, hint = reason.hint(), "stake failed");
                StakeOutcome::Failure {
                    protocol: binding.id().clone(),
                    reason,
                }
            }
        }
    }

    /// Runs everything up to, but excluding, submission.
    pub async fn preflight<C: ChainClient>(
        &self,
        binding: &ContractBinding<C>,
        amount: U256,
        staker: Address,
    ) -> Result<PreflightReport, StakeFailure> {
        let (_, estimate, fees) = self.prepare(binding, amount, staker).await?;
        Ok(PreflightReport { estimate, fees })
    }

    async fn prepare<C: ChainClient>(
        &self,
        binding: &ContractBinding<C>,
        amount: U256,
        staker: Address,
    ) -> Result<(ContractCall, GasEstimate, FeeParams), StakeFailure> {
        if amount.is_zero() {
            return Err(StakeFailure::InvalidAmount("amount must be positive".to_string()));
        }

        match binding.check_status().await {
            Ok(ProtocolStatus::Available) => {}
            Ok(ProtocolStatus::Unavailable(reason)) => {
                return Err(StakeFailure::ProtocolUnavailable(reason))
            }
            Err(err) => {
                return Err(StakeFailure::ProtocolUnavailable(format!(
                    "status check failed: {err}"
                )))
            }
        }

        let call = binding
            .deposit_call(amount, staker)
            .map_err(|err| StakeFailure::InvalidAmount(err.to_string()))?;
        let estimate = self.gas.estimate(binding, &call, staker).await?;
        let fees = resolve_fees(binding.chain(), &self.fees).await?;

        Ok((call, estimate, fees))
    }

    async fn execute<C: ChainClient>(
        &self,
        binding: &ContractBinding<C>,
        amount: U256,
        staker: Address,
    ) -> Result<StakeOutcome, StakeFailure> {
        let (call, estimate, fees) = self.prepare(binding, amount, staker).await?;
        let options = TxOptions {
            gas_limit: estimate.gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        };

        info!(
            protocol = %binding.id(),
            %amount,
            gas_limit = options.gas_limit,
            max_fee_per_gas = options.max_fee_per_gas,
            "submitting deposit"
        );

        let tx_hash = binding
            .chain()
            .submit(staker, &call, &options)
            .await
            .map_err(|err| StakeFailure::SubmissionFailed(err.to_string()))?;

        debug!(protocol = %binding.id(), %tx_hash, "waiting for confirmation");
        let receipt = binding
            .chain()
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|err| StakeFailure::ConfirmationFailed(err.to_string()))?;

        if !receipt.success {
            return Err(StakeFailure::TransactionFailed { tx_hash });
        }

        let explorer_url = binding.explorer_url(&tx_hash);
        info!(
            protocol = %binding.id(),
            %tx_hash,
            gas_used = receipt.gas_used,
            block_number = ?receipt.block_number,
            %explorer_url,
            "deposit confirmed"
        );

        Ok(StakeOutcome::Success {
            protocol: binding.id().clone(),
            tx_hash,
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
            explorer_url,
            estimate,
        })
    }
}

/// Reads the network fees, filling each missing value from the fallback and enforcing the cap.
pub async fn resolve_fees<C: ChainClient + ?Sized>(
    chain: &C,
    config: &FeeConfig,
) -> Result<FeeParams, StakeFailure> {
    let data = chain
        .fee_data()
        .await
        .map_err(|err| StakeFailure::FeeLookupFailed(err.to_string()))?;

    let max_fee_per_gas = data
        .max_fee_per_gas
        .unwrap_or_else(|| config.fallback_max_fee_per_gas());
    let max_priority_fee_per_gas = data
        .max_priority_fee_per_gas
        .unwrap_or_else(|| config.fallback_priority_fee_per_gas())
        .min(max_fee_per_gas);

    let fees = FeeParams {
        max_fee_per_gas,
        max_priority_fee_per_gas,
        max_fee_from_network: data.max_fee_per_gas.is_some(),
        priority_fee_from_network: data.max_priority_fee_per_gas.is_some(),
    };

    if !(fees.max_fee_from_network && fees.priority_fee_from_network) {
        debug!(?fees, "network omitted fee data, using fallback");
    }

    if let Some(cap) = config.max_fee_cap() {
        if max_fee_per_gas > cap {
            return Err(StakeFailure::FeeTooHigh {
                max_fee_per_gas,
                cap,
            });
        }
    }

    Ok(fees)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::sol_types::SolCall;
    use staker_chain::{errors::ChainError, types::FeeData};
    use staker_protocols::{abi::magma, registry::MAGMA_CONTRACT};
    use staker_test_utils::{chain::StubChain, fixtures::TEST_CONTRACT};

    use super::*;
    use crate::{
        config::gwei_to_wei,
        testing::{builtin_binding, erc4626_binding, STAKER},
    };

    fn executor() -> StakeExecutor {
        StakeExecutor::new(GasConfig::default(), FeeConfig::default())
    }

    #[tokio::test]
    async fn falls_back_per_field() {
        let chain = StubChain::new();
        chain.set_fee_data(FeeData {
            max_fee_per_gas: Some(gwei_to_wei(50)),
            max_priority_fee_per_gas: None,
        });

        let fees = resolve_fees(&chain, &FeeConfig::default())
            .await
            .expect("fees resolve");

        assert_eq!(fees.max_fee_per_gas, gwei_to_wei(50));
        assert_eq!(fees.max_priority_fee_per_gas, gwei_to_wei(2));
        assert!(fees.max_fee_from_network);
        assert!(!fees.priority_fee_from_network);
    }

    #[tokio::test]
    async fn enforces_fee_cap() {
        let chain = StubChain::new();
        chain.set_fee_data(FeeData {
            max_fee_per_gas: Some(gwei_to_wei(61)),
            max_priority_fee_per_gas: Some(gwei_to_wei(2)),
        });

        let result =
            resolve_fees(&chain, &FeeConfig::default().with_max_fee_cap_gwei(Some(60))).await;

        assert_eq!(
            result,
            Err(StakeFailure::FeeTooHigh {
                max_fee_per_gas: gwei_to_wei(61),
                cap: gwei_to_wei(60)
            })
        );
    }

    #[tokio::test]
    async fn successful_stake_reports_receipt() {
        let chain = Arc::new(StubChain::new());
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);

        let outcome = executor().run(&binding, U256::from(10u64), STAKER).await;

        let StakeOutcome::Success {
            tx_hash,
            gas_used,
            explorer_url,
            estimate,
            ..
        } = outcome.clone()
        else {
            panic!("expected success, got {outcome:?}");
        };

        let submissions = chain.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].tx_hash, tx_hash);
        assert_eq!(submissions[0].call.value, U256::from(10u64));
        assert_eq!(submissions[0].options.gas_limit, estimate.gas_limit);
        assert_eq!(
            submissions[0].options.max_fee_per_gas,
            gwei_to_wei(30),
            "stub reports no fee data"
        );
        assert_eq!(gas_used, staker_test_utils::chain::DEFAULT_GAS_USED);
        assert!(explorer_url.ends_with(&tx_hash.to_string()));
    }

    #[tokio::test]
    async fn paused_protocol_is_never_estimated() {
        let chain = Arc::new(StubChain::new());
        chain.set_view(
            MAGMA_CONTRACT,
            magma::pausedCall::SELECTOR,
            StubChain::word_bool(true),
        );
        let binding = builtin_binding(chain.clone(), "magma");

        let outcome = executor().run(&binding, U256::from(10u64), STAKER).await;

        assert_eq!(
            outcome.reason(),
            Some(&StakeFailure::ProtocolUnavailable("paused".to_string()))
        );
        assert_eq!(chain.estimate_calls(MAGMA_CONTRACT), 0);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn failing_status_check_marks_protocol_unavailable() {
        let chain = Arc::new(StubChain::new());
        chain.fail_view(
            MAGMA_CONTRACT,
            magma::pausedCall::SELECTOR,
            ChainError::Rpc("timeout".to_string()),
        );
        let binding = builtin_binding(chain.clone(), "magma");

        let outcome = executor().run(&binding, U256::from(10u64), STAKER).await;

        assert!(matches!(
            outcome.reason(),
            Some(StakeFailure::ProtocolUnavailable(msg)) if msg.contains("timeout")
        ));
    }

    #[tokio::test]
    async fn fee_lookup_failure_stops_before_submission() {
        let chain = Arc::new(StubChain::new());
        chain.fail_fee_data(ChainError::Rpc("method not found".to_string()));
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);

        let outcome = executor().run(&binding, U256::from(10u64), STAKER).await;

        assert!(matches!(
            outcome.reason(),
            Some(StakeFailure::FeeLookupFailed(_))
        ));
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn reverted_transaction_is_not_resent() {
        let chain = Arc::new(StubChain::new());
        chain.revert_on_chain(TEST_CONTRACT);
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);

        let outcome = executor().run(&binding, U256::from(10u64), STAKER).await;

        let submissions = chain.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(
            outcome.reason(),
            Some(&StakeFailure::TransactionFailed {
                tx_hash: submissions[0].tx_hash
            })
        );
    }

    #[tokio::test]
    async fn maps_submission_and_confirmation_errors() {
        let chain = Arc::new(StubChain::new());
        chain.fail_submit(TEST_CONTRACT, ChainError::Rpc("nonce too low".to_string()));
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);
        let outcome = executor().run(&binding, U256::from(10u64), STAKER).await;
        assert!(matches!(
            outcome.reason(),
            Some(StakeFailure::SubmissionFailed(msg)) if msg.contains("nonce too low")
        ));

        let chain = Arc::new(StubChain::new());
        chain.never_confirm(TEST_CONTRACT);
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);
        let outcome = executor().run(&binding, U256::from(10u64), STAKER).await;
        assert!(matches!(
            outcome.reason(),
            Some(StakeFailure::ConfirmationFailed(_))
        ));
    }

    #[tokio::test]
    async fn preflight_never_submits() {
        let chain = Arc::new(StubChain::new());
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);

        let report = executor()
            .preflight(&binding, U256::from(10u64), STAKER)
            .await
            .expect("preflight passes");

        assert_eq!(report.estimate.attempt, 1);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn rejects_zero_amount() {
        let chain = Arc::new(StubChain::new());
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);

        let outcome = executor().run(&binding, U256::ZERO, STAKER).await;

        assert!(matches!(
            outcome.reason(),
            Some(StakeFailure::InvalidAmount(_))
        ));
        assert_eq!(chain.estimate_calls(TEST_CONTRACT), 0);
    }
}
