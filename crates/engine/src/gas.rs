//! Gas estimation with a widening buffer.
//!
//! The retry policy lives in [`EstimationState::advance`], a pure transition that can be driven
//! without any I/O. [`GasEstimator`] is the async loop around it.

use std::time::Duration;

use alloy::primitives::Address;
use staker_chain::{client::ChainClient, errors::ChainError, types::ContractCall};
use staker_protocols::binding::ContractBinding;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    config::{GasConfig, BPS_DENOMINATOR},
    errors::StakeFailure,
};

/// A buffered gas estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
    /// The node's estimate.
    pub raw: u64,

    /// The buffer applied, in basis points.
    pub buffer_bps: u64,

    /// `raw` scaled by the buffer, rounded up.
    pub gas_limit: u64,

    /// The 1-based attempt that produced this estimate.
    pub attempt: u32,
}

impl GasEstimate {
    /// The buffer as a multiplier, for display.
    pub fn multiplier(&self) -> f64 {
        self.buffer_bps as f64 / BPS_DENOMINATOR as f64
    }
}

/// Scales `raw` by `buffer_bps`, rounding up and saturating at `u64::MAX`.
pub fn apply_buffer(raw: u64, buffer_bps: u64) -> u64 {
    let scaled = (raw as u128 * buffer_bps as u128).div_ceil(BPS_DENOMINATOR as u128);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// What to do after an estimation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The attempt succeeded.
    Done(GasEstimate),

    /// The attempt failed, wait `backoff` and try again with `next`.
    Retry {
        /// State for the next attempt.
        next: EstimationState,

        /// How long to wait first.
        backoff: Duration,
    },

    /// The final attempt failed.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,

        /// The error of the final attempt.
        last_error: ChainError,
    },
}

/// Where an estimation is in its retry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimationState {
    attempt: u32,
    buffer_bps: u64,
    config: GasConfig,
}

impl EstimationState {
    /// State of the first attempt.
    pub fn new(config: GasConfig) -> Self {
        Self {
            attempt: 1,
            buffer_bps: config.initial_buffer_bps(),
            config,
        }
    }

    /// The 1-based number of the current attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The buffer the current attempt applies, in basis points.
    pub fn buffer_bps(&self) -> u64 {
        self.buffer_bps
    }

    /// Feeds the result of the current attempt and returns the next step.
    pub fn advance(self, result: Result<u64, ChainError>) -> Step {
        match result {
            Ok(raw) => Step::Done(GasEstimate {
                raw,
                buffer_bps: self.buffer_bps,
                gas_limit: apply_buffer(raw, self.buffer_bps),
                attempt: self.attempt,
            }),
            Err(last_error) if self.attempt >= self.config.max_attempts() => Step::Exhausted {
                attempts: self.attempt,
                last_error,
            },
            Err(_) => Step::Retry {
                next: Self {
                    attempt: self.attempt + 1,
                    buffer_bps: self
                        .buffer_bps
                        .saturating_add(self.config.buffer_step_bps()),
                    config: self.config,
                },
                backoff: self.config.backoff(),
            },
        }
    }
}

/// Drives [`EstimationState`] against the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimator {
    config: GasConfig,
}

impl GasEstimator {
    /// Creates an estimator with the given policy.
    pub const fn new(config: GasConfig) -> Self {
        Self { config }
    }

    /// Estimates the gas `from` needs to execute `call` on `binding`'s protocol.
    pub async fn estimate<C: ChainClient>(
        &self,
        binding: &ContractBinding<C>,
        call: &ContractCall,
        from: Address,
    ) -> Result<GasEstimate, StakeFailure> {
        let mut state = EstimationState::new(self.config);

        loop {
            let attempt = state.attempt();
            let result = binding.chain().estimate_gas(from, call).await;

            match state.advance(result) {
                Step::Done(estimate) => {
                    debug!(
                        protocol = %binding.id(),
                        raw = estimate.raw,
                        gas_limit = estimate.gas_limit,
                        buffer = estimate.multiplier(),
                        attempt,
                        "gas estimated"
                    );
                    return Ok(estimate);
                }
                Step::Retry { next, backoff } => {
                    warn!(
                        protocol = %binding.id(),
                        attempt,
                        next_buffer = next.buffer_bps(),
                        ?backoff,
                        "gas estimation failed, retrying"
                    );
                    sleep(backoff).await;
                    state = next;
                }
                Step::Exhausted {
                    attempts,
                    last_error,
                } => {
                    warn!(protocol = %binding.id(), attempts, %last_error, "gas estimation exhausted");
                    return Err(StakeFailure::EstimationFailed {
                        attempts,
                        last_error: last_error.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use staker_test_utils::{chain::StubChain, fixtures::TEST_CONTRACT};
    use tokio::time::Instant;

    use super::*;
    use crate::testing::{erc4626_binding, STAKER};

    fn rpc_error() -> ChainError {
        ChainError::Rpc("connection reset".to_string())
    }

    #[test]
    fn buffer_rounds_up() {
        assert_eq!(apply_buffer(100_000, 12_000), 120_000);
        assert_eq!(apply_buffer(3, 12_000), 4);
        assert_eq!(apply_buffer(0, 12_000), 0);
        assert_eq!(apply_buffer(u64::MAX, 12_000), u64::MAX);
    }

    #[test]
    fn two_failures_then_success_uses_140_percent() {
        let state = EstimationState::new(GasConfig::default());

        let Step::Retry { next, backoff } = state.advance(Err(rpc_error())) else {
            panic!("first failure must retry");
        };
        assert_eq!(backoff, Duration::from_secs(1));

        let Step::Retry { next, .. } = next.advance(Err(rpc_error())) else {
            panic!("second failure must retry");
        };

        let Step::Done(estimate) = next.advance(Ok(100_000)) else {
            panic!("success must finish");
        };
        assert_eq!(estimate.buffer_bps, 14_000);
        assert_eq!(estimate.gas_limit, 140_000);
        assert_eq!(estimate.attempt, 3);
    }

    #[test]
    fn third_failure_exhausts() {
        let mut state = EstimationState::new(GasConfig::default());
        for _ in 0..2 {
            match state.advance(Err(rpc_error())) {
                Step::Retry { next, .. } => state = next,
                other => panic!("expected retry, got {other:?}"),
            }
        }

        assert_eq!(
            state.advance(Err(rpc_error())),
            Step::Exhausted {
                attempts: 3,
                last_error: rpc_error()
            }
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn policy_is_bounded_and_monotonic(
            failures in proptest::collection::vec(any::<bool>(), 0..8),
            raw in 1u64..30_000_000,
        ) {
            let config = GasConfig::default();
            let mut state = EstimationState::new(config);
            let mut last_buffer = state.buffer_bps();
            let mut attempts = 0;

            // `true` means the attempt fails, the sequence is padded with a success.
            for fails in failures.into_iter().chain(std::iter::once(false)) {
                attempts += 1;
                prop_assert!(attempts <= config.max_attempts());
                prop_assert!(state.buffer_bps() >= 12_000);
                prop_assert!(state.buffer_bps() >= last_buffer);
                last_buffer = state.buffer_bps();

                let result = if fails { Err(rpc_error()) } else { Ok(raw) };
                match state.advance(result) {
                    Step::Done(estimate) => {
                        prop_assert!(estimate.gas_limit >= estimate.raw);
                        prop_assert_eq!(estimate.attempt, attempts);
                        break;
                    }
                    Step::Retry { next, .. } => state = next,
                    Step::Exhausted { attempts: made, .. } => {
                        prop_assert_eq!(made, config.max_attempts());
                        break;
                    }
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn estimator_waits_between_attempts_only() {
        let chain = Arc::new(StubChain::new());
        chain.fail_estimates(TEST_CONTRACT, 3);
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);
        let call = binding
            .deposit_call(alloy::primitives::U256::from(1u64), STAKER)
            .expect("must encode");

        let start = Instant::now();
        let result = GasEstimator::new(GasConfig::default())
            .estimate(&binding, &call, STAKER)
            .await;

        assert!(matches!(
            result,
            Err(StakeFailure::EstimationFailed { attempts: 3, .. })
        ));
        assert_eq!(chain.estimate_calls(TEST_CONTRACT), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn estimator_recovers_on_third_attempt() {
        let chain = Arc::new(StubChain::new());
        chain.script_estimates(
            TEST_CONTRACT,
            [Err(rpc_error()), Err(rpc_error()), Ok(50_000)],
        );
        let binding = erc4626_binding(chain.clone(), "vault", TEST_CONTRACT);
        let call = binding
            .deposit_call(alloy::primitives::U256::from(1u64), STAKER)
            .expect("must encode");

        let estimate = GasEstimator::new(GasConfig::default())
            .estimate(&binding, &call, STAKER)
            .await
            .expect("third attempt succeeds");

        assert_eq!(estimate.buffer_bps, 14_000);
        assert_eq!(estimate.gas_limit, 70_000);
    }
}
