//! Engine configuration.

use std::time::Duration;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Chain id of the Monad testnet.
pub const MONAD_TESTNET_CHAIN_ID: u64 = 10_143;

/// One basis point is 1/10_000.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default gas buffer applied on the first estimation attempt (1.20x).
pub const DEFAULT_INITIAL_BUFFER_BPS: u64 = 12_000;

/// Default buffer increment after each failed estimation attempt (0.10x).
pub const DEFAULT_BUFFER_STEP_BPS: u64 = 1_000;

/// Default number of estimation attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait between two estimation attempts.
pub const DEFAULT_ESTIMATION_BACKOFF: Duration = Duration::from_secs(1);

/// Default max fee used when the network reports none, in gwei.
pub const DEFAULT_FALLBACK_MAX_FEE_GWEI: u64 = 30;

/// Default priority fee used when the network reports none, in gwei.
pub const DEFAULT_FALLBACK_PRIORITY_FEE_GWEI: u64 = 2;

/// Default delay between two protocols of the same session.
pub const DEFAULT_INTER_PROTOCOL_DELAY: Duration = Duration::from_secs(2);

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Gas estimation retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    initial_buffer_bps: u64,
    buffer_step_bps: u64,
    max_attempts: u32,
    backoff: Duration,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            initial_buffer_bps: DEFAULT_INITIAL_BUFFER_BPS,
            buffer_step_bps: DEFAULT_BUFFER_STEP_BPS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_ESTIMATION_BACKOFF,
        }
    }
}

impl GasConfig {
    /// Sets the buffer of the first attempt, in basis points.
    ///
    /// Values below [`BPS_DENOMINATOR`] are raised to it, a buffer never shrinks the estimate.
    pub fn with_initial_buffer_bps(self, bps: u64) -> Self {
        Self {
            initial_buffer_bps: bps.max(BPS_DENOMINATOR),
            ..self
        }
    }

    /// Sets the buffer increment applied after each failure, in basis points.
    pub fn with_buffer_step_bps(self, bps: u64) -> Self {
        Self {
            buffer_step_bps: bps,
            ..self
        }
    }

    /// Sets the number of attempts. At least one attempt is always made.
    pub fn with_max_attempts(self, attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
            ..self
        }
    }

    /// Sets the wait between attempts.
    pub fn with_backoff(self, backoff: Duration) -> Self {
        Self { backoff, ..self }
    }

    /// Returns the buffer of the first attempt, in basis points.
    pub fn initial_buffer_bps(&self) -> u64 {
        self.initial_buffer_bps.max(BPS_DENOMINATOR)
    }

    /// Returns the buffer increment, in basis points.
    pub fn buffer_step_bps(&self) -> u64 {
        self.buffer_step_bps
    }

    /// Returns the number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Returns the wait between attempts.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

/// Fee fallbacks and the optional max fee ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    fallback_max_fee_gwei: u64,
    fallback_priority_fee_gwei: u64,
    max_fee_cap_gwei: Option<u64>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fallback_max_fee_gwei: DEFAULT_FALLBACK_MAX_FEE_GWEI,
            fallback_priority_fee_gwei: DEFAULT_FALLBACK_PRIORITY_FEE_GWEI,
            max_fee_cap_gwei: None,
        }
    }
}

impl FeeConfig {
    /// Sets the max fee used when the network reports none.
    pub fn with_fallback_max_fee_gwei(self, gwei: u64) -> Self {
        Self {
            fallback_max_fee_gwei: gwei,
            ..self
        }
    }

    /// Sets the priority fee used when the network reports none.
    pub fn with_fallback_priority_fee_gwei(self, gwei: u64) -> Self {
        Self {
            fallback_priority_fee_gwei: gwei,
            ..self
        }
    }

    /// Refuses to submit when the max fee exceeds `gwei`.
    pub fn with_max_fee_cap_gwei(self, gwei: Option<u64>) -> Self {
        Self {
            max_fee_cap_gwei: gwei,
            ..self
        }
    }

    /// Returns the fallback max fee, in wei.
    pub fn fallback_max_fee_per_gas(&self) -> u128 {
        gwei_to_wei(self.fallback_max_fee_gwei)
    }

    /// Returns the fallback priority fee, in wei.
    pub fn fallback_priority_fee_per_gas(&self) -> u128 {
        gwei_to_wei(self.fallback_priority_fee_gwei)
    }

    /// Returns the max fee ceiling, in wei.
    pub fn max_fee_cap(&self) -> Option<u128> {
        self.max_fee_cap_gwei.map(gwei_to_wei)
    }
}

/// Converts gwei to wei.
pub const fn gwei_to_wei(gwei: u64) -> u128 {
    gwei as u128 * WEI_PER_GWEI
}

/// Everything a session needs to know besides the chain and the protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    chain_id: u64,
    amount: U256,
    inter_protocol_delay: Duration,
    gas: GasConfig,
    fees: FeeConfig,
}

impl SessionConfig {
    /// Creates a config staking `amount` wei per protocol on `chain_id`.
    pub fn new(chain_id: u64, amount: U256) -> Self {
        Self {
            chain_id,
            amount,
            inter_protocol_delay: DEFAULT_INTER_PROTOCOL_DELAY,
            gas: GasConfig::default(),
            fees: FeeConfig::default(),
        }
    }

    /// Sets the delay between two protocols.
    pub fn with_inter_protocol_delay(self, delay: Duration) -> Self {
        Self {
            inter_protocol_delay: delay,
            ..self
        }
    }

    /// Sets the gas estimation policy.
    pub fn with_gas(self, gas: GasConfig) -> Self {
        Self { gas, ..self }
    }

    /// Sets the fee policy.
    pub fn with_fees(self, fees: FeeConfig) -> Self {
        Self { fees, ..self }
    }

    /// Returns the expected chain id.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Returns the stake amount per protocol, in wei.
    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Returns the delay between two protocols.
    pub fn inter_protocol_delay(&self) -> Duration {
        self.inter_protocol_delay
    }

    /// Returns the gas estimation policy.
    pub fn gas(&self) -> GasConfig {
        self.gas
    }

    /// Returns the fee policy.
    pub fn fees(&self) -> FeeConfig {
        self.fees
    }
}
