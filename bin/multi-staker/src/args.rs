//! Parses command-line arguments for the multi-staker CLI.

use std::path::PathBuf;

use clap::{crate_version, Args, Parser, Subcommand};

use crate::constants::DEFAULT_CONFIG_PATH;

#[derive(Debug, Parser)]
#[command(
    name = "multi-staker",
    about = "Stakes MON into several Monad testnet liquid staking protocols",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "STAKER_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "the TOML config file, defaults are used when it does not exist"
    )]
    pub(crate) config: PathBuf,

    #[command(flatten)]
    pub(crate) overrides: Overrides,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Check preconditions, status and gas for every protocol without sending anything.
    DryRun,

    /// Run one session now.
    StakeNow,

    /// Run one session now, then keep staking on a daily schedule until interrupted.
    Schedule,

    /// List the known protocols and the effective configuration.
    Protocols,
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct Overrides {
    #[arg(long, global = true, env = "RPC_URL", help = "the JSON-RPC endpoint")]
    pub(crate) rpc_url: Option<String>,

    #[arg(
        long,
        global = true,
        env = "PRIVATE_KEY",
        hide_env_values = true,
        help = "hex private key of the staking account"
    )]
    pub(crate) private_key: Option<String>,

    #[arg(long, global = true, env = "CHAIN_ID", help = "the expected chain id")]
    pub(crate) chain_id: Option<u64>,

    #[arg(
        long,
        global = true,
        env = "STAKE_AMOUNT",
        help = "amount staked into each protocol per session, in MON"
    )]
    pub(crate) stake_amount: Option<String>,

    #[arg(
        long,
        global = true,
        env = "ENABLED_PROTOCOLS",
        value_delimiter = ',',
        help = "comma-separated protocols to stake into, in order"
    )]
    pub(crate) enabled_protocols: Option<Vec<String>>,

    #[arg(
        long,
        global = true,
        env = "STAKING_FREQUENCY",
        help = "sessions per day when scheduling, between 1 and 24"
    )]
    pub(crate) staking_frequency: Option<u32>,

    #[arg(
        long,
        global = true,
        env = "MAX_FEE_CAP_GWEI",
        help = "refuse to submit when the max fee per gas exceeds this many gwei"
    )]
    pub(crate) max_fee_cap_gwei: Option<u64>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_may_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "multi-staker",
            "stake-now",
            "--enabled-protocols",
            "magma,kintsu",
            "--stake-amount",
            "0.5",
        ])
        .expect("valid arguments");

        assert!(matches!(cli.command, Command::StakeNow));
        assert_eq!(
            cli.overrides.enabled_protocols,
            Some(vec!["magma".to_string(), "kintsu".to_string()])
        );
        assert_eq!(cli.overrides.stake_amount.as_deref(), Some("0.5"));
    }
}
