//! Corridor batcher daemon.
//!
//! Loads the chain configuration, verifies this validator's signing keys are
//! reachable, and runs one batching loop per configured chain until ctrl-c.

mod args;
mod dev;

use std::{fs, sync::Arc, time::Duration};

use anyhow::Context;
use args::Args;
use clap::Parser;
use corridor_batcher::{Batcher, BatcherConfig, BatcherManager, OpsFactory};
use corridor_chain_ops::{create_chain_operations, traits::SecretsManager};
use corridor_common::{
    logging::{self, LoggerConfig},
    retry::{policies::ExponentialBackoff, retry_with_backoff, DEFAULT_STARTUP_MAX_RETRIES},
};
use corridor_test_utils::bridge::InMemoryBridge;
use dev::DevBackendConfig;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
struct Config {
    #[serde(flatten)]
    batcher: BatcherConfig,
    backend: BackendConfig,
}

/// Which backend serves the bridge contract, indexer and secrets interfaces.
///
/// The daemon ships the in-process dev backend; production deployments plug
/// real clients in through the library traits.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum BackendConfig {
    Dev(DevBackendConfig),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(LoggerConfig::with_base_name("corridor-batcherd"));

    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("reading config file {}", args.config.display()))?;
    let config: Config = toml::from_str(&raw).context("parsing config file")?;
    if config.batcher.chains.is_empty() {
        anyhow::bail!("no chains configured");
    }

    let backend = match &config.backend {
        BackendConfig::Dev(dev) => dev::build_backend(dev, &config.batcher)?,
    };

    probe_signing_keys(&config.batcher, backend.as_ref())?;

    let manager = BatcherManager::new(build_batchers(&config.batcher, &backend)?);
    info!(chains = manager.len(), "corridor batcherd starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    if let Err(err) = manager.run(shutdown_rx).await {
        error!(%err, "batcher manager terminated with error");
        return Err(err.into());
    }
    info!("corridor batcherd stopped");
    Ok(())
}

/// Fails fast when a configured chain has no reachable signing keys.
///
/// The secrets backend may still be coming up at boot, so the probe retries
/// with backoff before giving up.
fn probe_signing_keys(config: &BatcherConfig, secrets: &dyn SecretsManager) -> anyhow::Result<()> {
    for chain in &config.chains {
        let chain_id = chain.chain_id();
        retry_with_backoff(
            "load signing keys",
            DEFAULT_STARTUP_MAX_RETRIES,
            &ExponentialBackoff::default(),
            || match chain {
                corridor_batcher::ChainConfig::Evm(_) => {
                    secrets.evm_key(&chain_id).map(|_| ())
                }
                _ => secrets.cardano_wallet(&chain_id).map(|_| ()),
            },
        )
        .with_context(|| format!("loading signing keys for chain {chain_id}"))?;
    }
    Ok(())
}

fn build_batchers(
    config: &BatcherConfig,
    backend: &Arc<InMemoryBridge>,
) -> anyhow::Result<Vec<Batcher>> {
    let tick_interval = Duration::from_secs(config.tick_interval_secs);
    let mut batchers = Vec::with_capacity(config.chains.len());

    for chain in &config.chains {
        let ops_config = chain.to_ops_config()?;
        let factory_backend = backend.clone();
        let factory: OpsFactory = Box::new(move || {
            create_chain_operations(
                ops_config.clone(),
                factory_backend.clone(),
                factory_backend.clone(),
                factory_backend.as_ref(),
                None,
            )
        });
        batchers.push(Batcher::new(
            chain.chain_id(),
            tick_interval,
            backend.clone(),
            factory,
        ));
    }
    Ok(batchers)
}
