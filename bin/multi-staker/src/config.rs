//! Configuration: the optional TOML file merged with command-line and environment overrides.

use std::{collections::BTreeMap, fmt, time::Duration};

use alloy::primitives::{utils::parse_ether, Address, U256};
use serde::{Deserialize, Serialize};
use staker_chain::rpc::ConfirmationConfig;
use staker_engine::{
    config::{FeeConfig, GasConfig, SessionConfig, MONAD_TESTNET_CHAIN_ID},
    errors::ScheduleError,
    schedule::HOURS_PER_DAY,
    scheduler::DEFAULT_COUNTDOWN_INTERVAL,
};
use staker_protocols::{errors::RegistryError, id::ProtocolId, registry::ProtocolRegistry};
use thiserror::Error;

use crate::{
    args::Overrides,
    constants::{
        DEFAULT_ENABLED_PROTOCOLS, DEFAULT_RPC_URL, DEFAULT_STAKE_AMOUNT,
        DEFAULT_STAKING_FREQUENCY,
    },
};

/// The contents of the config file. Every value is optional.
///
/// The private key is deliberately absent, it is only ever read from the environment or the
/// command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// The JSON-RPC endpoint.
    pub rpc_url: Option<String>,

    /// The expected chain id.
    pub chain_id: Option<u64>,

    /// Stake per protocol per session, in MON.
    pub stake_amount: Option<String>,

    /// Protocols to stake into, in order.
    pub enabled_protocols: Option<Vec<ProtocolId>>,

    /// Sessions per day.
    pub staking_frequency: Option<u32>,

    /// Pause between two protocols of the same session.
    pub inter_protocol_delay: Option<Duration>,

    /// How often the scheduler logs the time to the next session.
    pub countdown_interval: Option<Duration>,

    /// Gas estimation policy.
    pub gas: GasConfig,

    /// Fee fallbacks and ceiling.
    pub fees: FeeConfig,

    /// Receipt polling.
    pub confirmation: ConfirmationConfig,

    /// Contract address overrides per protocol.
    pub contracts: BTreeMap<ProtocolId, Address>,
}

/// Errors in the merged configuration. All of them stop the process before any session.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// No signing key was provided.
    #[error("PRIVATE_KEY is not set")]
    MissingPrivateKey,

    /// The stake amount is not a decimal MON amount.
    #[error("invalid stake amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    /// The stake amount is zero.
    #[error("stake amount must be positive")]
    ZeroAmount,

    /// The staking frequency is out of range.
    #[error(transparent)]
    Frequency(#[from] ScheduleError),

    /// The protocol list or a contract override is invalid.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A private key that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SecretKey(String);

impl SecretKey {
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// The effective configuration.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub rpc_url: String,
    pub private_key: Option<SecretKey>,
    pub stake_amount: String,
    pub enabled: Vec<ProtocolId>,
    pub frequency: u32,
    pub session: SessionConfig,
    pub confirmation: ConfirmationConfig,
    pub countdown_interval: Duration,
    pub registry: ProtocolRegistry,
}

impl Settings {
    /// Merges `config` with `overrides`, which win, and validates the result.
    pub(crate) fn resolve(config: Config, overrides: Overrides) -> Result<Self, ConfigError> {
        let rpc_url = overrides
            .rpc_url
            .or(config.rpc_url)
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let private_key = overrides
            .private_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(SecretKey);

        let stake_amount = overrides
            .stake_amount
            .or(config.stake_amount)
            .unwrap_or_else(|| DEFAULT_STAKE_AMOUNT.to_string());
        let amount = parse_amount(&stake_amount)?;

        let enabled = match overrides.enabled_protocols {
            Some(ids) => ids
                .iter()
                .filter(|id| !id.trim().is_empty())
                .map(|id| id.parse())
                .collect::<Result<Vec<ProtocolId>, _>>()?,
            None => match config.enabled_protocols {
                Some(ids) => ids,
                None => DEFAULT_ENABLED_PROTOCOLS
                    .iter()
                    .map(|id| id.parse())
                    .collect::<Result<Vec<ProtocolId>, _>>()?,
            },
        };

        let frequency = overrides
            .staking_frequency
            .or(config.staking_frequency)
            .unwrap_or(DEFAULT_STAKING_FREQUENCY);
        if !(1..=HOURS_PER_DAY).contains(&frequency) {
            return Err(ScheduleError::InvalidFrequency(frequency).into());
        }

        let fees = match overrides.max_fee_cap_gwei {
            Some(cap) => config.fees.with_max_fee_cap_gwei(Some(cap)),
            None => config.fees,
        };

        let chain_id = overrides
            .chain_id
            .or(config.chain_id)
            .unwrap_or(MONAD_TESTNET_CHAIN_ID);
        let mut session = SessionConfig::new(chain_id, amount)
            .with_gas(config.gas)
            .with_fees(fees);
        if let Some(delay) = config.inter_protocol_delay {
            session = session.with_inter_protocol_delay(delay);
        }

        let mut registry = ProtocolRegistry::builtin();
        for (id, contract) in &config.contracts {
            registry = registry.with_contract_override(id, *contract)?;
        }
        // fail on typos and duplicates before anything touches the network
        registry.resolve(&enabled)?;

        Ok(Self {
            rpc_url,
            private_key,
            stake_amount,
            enabled,
            frequency,
            session,
            confirmation: config.confirmation,
            countdown_interval: config
                .countdown_interval
                .unwrap_or(DEFAULT_COUNTDOWN_INTERVAL),
            registry,
        })
    }

    /// The signing key, required by every command that talks to the chain.
    pub(crate) fn private_key(&self) -> Result<&SecretKey, ConfigError> {
        self.private_key
            .as_ref()
            .ok_or(ConfigError::MissingPrivateKey)
    }
}

fn parse_amount(amount: &str) -> Result<U256, ConfigError> {
    let wei = parse_ether(amount.trim()).map_err(|err| ConfigError::InvalidAmount {
        amount: amount.to_string(),
        reason: err.to_string(),
    })?;

    if wei.is_zero() {
        return Err(ConfigError::ZeroAmount);
    }

    Ok(wei)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use staker_protocols::registry::MAGMA_CONTRACT;

    use super::*;

    fn id(s: &str) -> ProtocolId {
        s.parse().expect("valid id")
    }

    #[test]
    fn test_config_serde_toml() {
        let config = r#"
            rpc_url = "https://testnet-rpc.monad.xyz"
            chain_id = 10143
            stake_amount = "0.05"
            enabled_protocols = ["kintsu", "Apriori"]
            staking_frequency = 4
            inter_protocol_delay = { secs = 3, nanos = 0 }
            countdown_interval = { secs = 300, nanos = 0 }

            [gas]
            initial_buffer_bps = 12000
            buffer_step_bps = 1000
            max_attempts = 3
            backoff = { secs = 1, nanos = 0 }

            [fees]
            fallback_max_fee_gwei = 30
            fallback_priority_fee_gwei = 2
            max_fee_cap_gwei = 60

            [confirmation]
            timeout = { secs = 120, nanos = 0 }
            poll_interval = { secs = 1, nanos = 0 }

            [contracts]
            magma = "0x00000000000000000000000000000000000000c1"
        "#;

        let config = toml::from_str::<Config>(config);
        assert!(
            config.is_ok(),
            "must be able to deserialize config from toml but got: {}",
            config.unwrap_err()
        );

        let config = config.unwrap();
        assert_eq!(
            config.enabled_protocols,
            Some(vec![id("kintsu"), id("apriori")])
        );
        assert_eq!(config.fees.max_fee_cap(), Some(60_000_000_000));
        assert_eq!(
            config.contracts.get(&id("magma")),
            Some(&address!("00000000000000000000000000000000000000c1"))
        );

        let serialized = toml::to_string(&config).expect("must be able to serialize config");
        let deserialized = toml::from_str::<Config>(&serialized).expect("must round trip");
        assert_eq!(config, deserialized, "must be the same before and after serialization");
    }

    #[test]
    fn empty_file_means_defaults() {
        let config = toml::from_str::<Config>("").expect("empty config is valid");
        let settings = Settings::resolve(config, Overrides::default()).expect("defaults are valid");

        assert_eq!(settings.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(settings.enabled, [id("kintsu"), id("magma"), id("apriori")]);
        assert_eq!(settings.frequency, 1);
        assert_eq!(settings.session.chain_id(), MONAD_TESTNET_CHAIN_ID);
        assert_eq!(
            settings.session.amount(),
            U256::from(10_000_000_000_000_000u64)
        );
        assert!(matches!(
            settings.private_key(),
            Err(ConfigError::MissingPrivateKey)
        ));
    }

    #[test]
    fn overrides_win_over_the_file() {
        let config = Config {
            stake_amount: Some("1".to_string()),
            staking_frequency: Some(2),
            ..Default::default()
        };
        let overrides = Overrides {
            stake_amount: Some("0.5".to_string()),
            enabled_protocols: Some(vec![" Magma".to_string(), "kintsu".to_string()]),
            max_fee_cap_gwei: Some(60),
            private_key: Some("  0xabc  ".to_string()),
            ..Default::default()
        };

        let settings = Settings::resolve(config, overrides).expect("valid");

        assert_eq!(settings.stake_amount, "0.5");
        assert_eq!(settings.frequency, 2);
        assert_eq!(settings.enabled, [id("magma"), id("kintsu")]);
        assert_eq!(settings.session.fees().max_fee_cap(), Some(60_000_000_000));
        assert_eq!(settings.private_key().expect("set").expose(), "0xabc");
        assert!(!format!("{settings:?}").contains("0xabc"));
    }

    #[test]
    fn contract_overrides_reach_the_registry() {
        let contract = address!("00000000000000000000000000000000000000c1");
        let config = Config {
            contracts: BTreeMap::from([(id("magma"), contract)]),
            ..Default::default()
        };

        let settings = Settings::resolve(config, Overrides::default()).expect("valid");

        let magma = settings.registry.get(&id("magma")).expect("builtin");
        assert_eq!(magma.contract(), contract);
        assert_ne!(magma.contract(), MAGMA_CONTRACT);
    }

    #[test]
    fn rejects_invalid_values() {
        let with = |overrides: Overrides| Settings::resolve(Config::default(), overrides);

        assert!(matches!(
            with(Overrides {
                stake_amount: Some("abc".to_string()),
                ..Default::default()
            }),
            Err(ConfigError::InvalidAmount { .. })
        ));
        assert!(matches!(
            with(Overrides {
                stake_amount: Some("0".to_string()),
                ..Default::default()
            }),
            Err(ConfigError::ZeroAmount)
        ));
        assert!(matches!(
            with(Overrides {
                staking_frequency: Some(25),
                ..Default::default()
            }),
            Err(ConfigError::Frequency(ScheduleError::InvalidFrequency(25)))
        ));
        assert!(matches!(
            with(Overrides {
                enabled_protocols: Some(vec!["lido".to_string()]),
                ..Default::default()
            }),
            Err(ConfigError::Registry(RegistryError::UnknownProtocol { .. }))
        ));
        assert!(matches!(
            with(Overrides {
                enabled_protocols: Some(vec!["magma".to_string(), "magma".to_string()]),
                ..Default::default()
            }),
            Err(ConfigError::Registry(RegistryError::DuplicateProtocol(_)))
        ));
        assert!(matches!(
            with(Overrides {
                enabled_protocols: Some(vec![String::new()]),
                ..Default::default()
            }),
            Err(ConfigError::Registry(RegistryError::NoProtocolsEnabled))
        ));
    }
}
