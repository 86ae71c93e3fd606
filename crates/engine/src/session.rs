//! Runs one staking pass over every enabled protocol.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use staker_chain::client::ChainClient;
use staker_protocols::{binding::ContractBinding, descriptor::ProtocolDescriptor, id::ProtocolId};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    config::SessionConfig,
    errors::SessionAbort,
    executor::StakeExecutor,
    outcome::{DryRunReport, ProtocolBalance, ProtocolCheck, SessionResult},
};

/// Owns the protocol bindings and runs sessions over them.
///
/// Sessions never overlap: a session requested while another is running waits for it to finish.
#[derive(Debug)]
pub struct SessionOrchestrator<C> {
    chain: Arc<C>,
    bindings: Vec<ContractBinding<C>>,
    staker: Address,
    config: SessionConfig,
    executor: StakeExecutor,
    run_guard: Mutex<()>,
}

impl<C: ChainClient> SessionOrchestrator<C> {
    /// Binds `descriptors` to `chain`. They are staked into in the given order.
    pub fn new(
        chain: Arc<C>,
        descriptors: Vec<ProtocolDescriptor>,
        staker: Address,
        config: SessionConfig,
    ) -> Self {
        Self {
            bindings: ContractBinding::bind_all(descriptors, chain.clone()),
            chain,
            staker,
            executor: StakeExecutor::new(config.gas(), config.fees()),
            config,
            run_guard: Mutex::new(()),
        }
    }

    /// The enabled protocols, in order.
    pub fn protocols(&self) -> impl Iterator<Item = &ProtocolId> {
        self.bindings.iter().map(ContractBinding::id)
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The account staking.
    pub fn staker(&self) -> Address {
        self.staker
    }

    /// Stakes into every enabled protocol once.
    ///
    /// Never fails: a failed precondition aborts the session with zero outcomes, a failed
    /// protocol is recorded and the next one is attempted.
    pub async fn run_session(&self) -> SessionResult {
        let _guard = self.run_guard.lock().await;
        let amount = self.config.amount();
        info!(protocols = self.bindings.len(), %amount, staker = %self.staker, "starting session");

        if let Err(abort) = self.check_preconditions().await {
            warn!(%abort, "session aborted before staking");
            return SessionResult::aborted(amount, abort);
        }

        let mut outcomes = Vec::with_capacity(self.bindings.len());
        for (i, binding) in self.bindings.iter().enumerate() {
            if i > 0 {
                let delay = self.config.inter_protocol_delay();
                debug!(?delay, next = %binding.id(), "pausing between protocols");
                sleep(delay).await;
            }

            outcomes.push(self.executor.run(binding, amount, self.staker).await);
        }

        SessionResult {
            amount,
            outcomes,
            abort: None,
            balances: self.collect_balances().await,
        }
    }

    /// Checks what a session would do without submitting anything.
    pub async fn dry_run(&self) -> DryRunReport {
        let _guard = self.run_guard.lock().await;
        let amount = self.config.amount();

        if let Err(abort) = self.check_preconditions().await {
            return DryRunReport {
                abort: Some(abort),
                checks: Vec::new(),
                balances: Vec::new(),
            };
        }

        let mut checks = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            checks.push(ProtocolCheck {
                protocol: binding.id().clone(),
                result: self.executor.preflight(binding, amount, self.staker).await,
            });
        }

        DryRunReport {
            abort: None,
            checks,
            balances: self.collect_balances().await,
        }
    }

    async fn check_preconditions(&self) -> Result<(), SessionAbort> {
        let actual = self
            .chain
            .chain_id()
            .await
            .map_err(|err| SessionAbort::PreconditionFailed(err.to_string()))?;
        let expected = self.config.chain_id();
        if actual != expected {
            return Err(SessionAbort::WrongNetwork { expected, actual });
        }

        let available = self
            .chain
            .balance(self.staker)
            .await
            .map_err(|err| SessionAbort::PreconditionFailed(err.to_string()))?;
        let required = self
            .config
            .amount()
            .saturating_mul(U256::from(self.bindings.len()));
        if available < required {
            return Err(SessionAbort::InsufficientBalance {
                required,
                available,
            });
        }

        debug!(%available, %required, chain_id = actual, "preconditions met");
        Ok(())
    }

    async fn collect_balances(&self) -> Vec<ProtocolBalance> {
        let mut balances = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let balance = match binding.staked_balance(self.staker).await {
                Ok(balance) => Some(balance),
                Err(err) => {
                    warn!(protocol = %binding.id(), %err, "balance query failed");
                    None
                }
            };

            balances.push(ProtocolBalance {
                protocol: binding.id().clone(),
                reward_token: binding.descriptor().reward_token(),
                balance,
            });
        }

        balances
    }
}
