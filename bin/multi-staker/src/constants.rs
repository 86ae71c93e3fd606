//! Defaults for values not set in the config file, the environment or on the command line.

/// Config file read when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "staker.toml";

/// Public Monad testnet endpoint.
pub(crate) const DEFAULT_RPC_URL: &str = "https://testnet-rpc.monad.xyz";

/// Stake per protocol per session, in MON.
pub(crate) const DEFAULT_STAKE_AMOUNT: &str = "0.01";

/// Protocols staked into when none are configured, in order.
pub(crate) const DEFAULT_ENABLED_PROTOCOLS: [&str; 3] = ["kintsu", "magma", "apriori"];

/// Sessions per day.
pub(crate) const DEFAULT_STAKING_FREQUENCY: u32 = 1;
