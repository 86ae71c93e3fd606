//! Stakes a fixed amount of MON into several Monad testnet liquid staking protocols, either once
//! or on a daily schedule.

use std::{fs, io, path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use args::{Cli, Command};
use chrono::Local;
use clap::Parser;
use config::{Config, Settings};
use serde::de::DeserializeOwned;
use staker_chain::{account::Account, rpc::RpcChainClient};
use staker_common::logging::{self, LoggerConfig};
use staker_engine::{
    schedule::compute_schedule, scheduler::Scheduler, session::SessionOrchestrator,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

mod args;
mod config;

mod constants;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    logging::init(LoggerConfig::from_env(env!("CARGO_PKG_NAME")));
    if let Ok(path) = &dotenv {
        debug!(?path, "loaded environment file");
    }

    let cli = Cli::parse();
    let config = parse_toml::<Config>(&cli.config)?.unwrap_or_default();
    let settings = Settings::resolve(config, cli.overrides).context("invalid configuration")?;

    if let Command::Protocols = cli.command {
        list_protocols(&settings);
        return Ok(());
    }

    let account = Account::from_private_key(settings.private_key()?.expose())
        .context("could not load the staking account")?;
    let chain = RpcChainClient::connect(&settings.rpc_url, &account, settings.confirmation)
        .context("could not connect to the rpc endpoint")?;
    let descriptors = settings.registry.resolve(&settings.enabled)?;

    info!(
        staker = %account.address(),
        rpc_url = %settings.rpc_url,
        protocols = ?settings.enabled,
        amount = %settings.stake_amount,
        "starting multi-staker"
    );

    let orchestrator = Arc::new(SessionOrchestrator::new(
        Arc::new(chain),
        descriptors,
        account.address(),
        settings.session,
    ));

    match cli.command {
        Command::DryRun => {
            let report = orchestrator.dry_run().await;
            report.log();
            if !report.passed() {
                bail!("dry run found problems, see the log above");
            }
        }
        Command::StakeNow => {
            let result = orchestrator.run_session().await;
            result.log();
            if let Some(abort) = result.abort {
                bail!("session aborted: {abort}");
            }
            if result.successes() == 0 {
                bail!("no protocol was staked into");
            }
        }
        Command::Schedule => {
            let schedule = compute_schedule(settings.frequency, Local::now().time())?;
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_on_interrupt(shutdown.clone()));

            Scheduler::new(orchestrator, schedule)
                .with_countdown_interval(settings.countdown_interval)
                .start(shutdown)
                .await;
            info!("multi-staker stopped");
        }
        Command::Protocols => unreachable!("handled before connecting"),
    }

    Ok(())
}

async fn shutdown_on_interrupt(shutdown: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("received interrupt, stopping after the current session");
            shutdown.cancel();
        }
        Err(err) => error!(%err, "could not listen for interrupts"),
    }
}

fn list_protocols(settings: &Settings) {
    for descriptor in settings.registry.iter() {
        info!(
            id = %descriptor.id(),
            name = descriptor.display_name(),
            contract = %descriptor.contract(),
            reward_token = descriptor.reward_token(),
            enabled = settings.enabled.contains(descriptor.id()),
            "protocol"
        );
    }

    info!(
        rpc_url = %settings.rpc_url,
        chain_id = settings.session.chain_id(),
        amount = %settings.stake_amount,
        frequency = settings.frequency,
        protocols = ?settings.enabled,
        max_fee_cap = ?settings.session.fees().max_fee_cap(),
        key_configured = settings.private_key.is_some(),
        "effective configuration"
    );
}

/// Reads and parses a TOML file from the given path into the given type `T`.
///
/// Returns `None` if the file does not exist.
fn parse_toml<T>(path: impl AsRef<Path>) -> Result<Option<T>>
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(?path, "config file not found, using defaults");
            return Ok(None);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    trace!(?contents, "read file");

    let parsed = toml::from_str::<T>(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(?parsed, "parsed TOML file");

    Ok(Some(parsed))
}
