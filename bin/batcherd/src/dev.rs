//! The in-process dev backend.
//!
//! Stands in for the bridge contract, the indexer and the secrets manager so
//! the batching loops can run end to end on one machine. Wallets are derived
//! from a configured seed, the dev committee always contains them, and every
//! configured chain starts with a funded multisig and one pending transfer.

use std::sync::Arc;

use anyhow::Context;
use corridor_batcher::{BatcherConfig, ChainConfig};
use corridor_primitives::{
    buf::Buf32,
    chain::{BlockPoint, ChainId},
    tx::{BridgeReceiver, ConfirmedTransaction, TransactionType},
};
use corridor_test_utils::{
    bridge::{BridgeState, InMemoryBridge},
    gen::{committee_with, seeded_wallet, utxo},
};
use corridor_tx_builder::{cardano::address::script_address, policy::resolve_policies};
use serde::Deserialize;
use tracing::info;

/// Dev backend tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DevBackendConfig {
    /// Chain tip the indexer reports.
    #[serde(default = "default_tip")]
    pub(crate) tip: u64,
    /// Base-asset amount funded to each multisig address.
    #[serde(default = "default_funding")]
    pub(crate) funding: u64,
    /// Number of committee members beside this validator.
    #[serde(default = "default_committee_extras")]
    pub(crate) committee_extras: u32,
    /// Seed byte the dev wallets are derived from. Keep it small; large
    /// values can leave the derived secp256k1 scalar out of range.
    #[serde(default = "default_wallet_seed")]
    pub(crate) wallet_seed: u8,
}

fn default_tip() -> u64 {
    75
}

fn default_funding() -> u64 {
    50_000_000
}

fn default_committee_extras() -> u32 {
    3
}

fn default_wallet_seed() -> u8 {
    1
}

/// Builds and seeds the in-memory backend for every configured chain.
pub(crate) fn build_backend(
    dev: &DevBackendConfig,
    config: &BatcherConfig,
) -> anyhow::Result<Arc<InMemoryBridge>> {
    let (wallet, own_keys) = seeded_wallet(dev.wallet_seed);
    let committee = committee_with(own_keys, dev.committee_extras);

    let bridge = InMemoryBridge::new(BridgeState::default());
    bridge.with_state(|state| {
        state.tip = BlockPoint::new(dev.tip, Buf32([dev.wallet_seed; 32]));
        state.validators = committee.clone();
    });

    for chain in &config.chains {
        let chain_id = chain.chain_id();
        match chain {
            ChainConfig::CardanoReactor(cardano) | ChainConfig::CardanoSkyline(cardano) => {
                let policies = resolve_policies(&committee, &own_keys, cardano.network)
                    .with_context(|| format!("deriving dev multisig for chain {chain_id}"))?;
                bridge.with_state(|state| {
                    state.wallets.insert(chain_id.clone(), wallet);
                    state
                        .utxos
                        .insert(policies.funds.address.clone(), vec![utxo(1, 0, dev.funding)]);
                    state.utxos.insert(
                        policies.fee.address.clone(),
                        vec![utxo(2, 0, dev.funding / 10)],
                    );
                    state.confirmed.insert(
                        chain_id.clone(),
                        vec![dev_transfer(
                            &chain_id,
                            script_address(&[0x21; 28], cardano.network),
                            dev.funding / 20,
                        )],
                    );
                });
                info!(%chain_id, funds = %policies.funds.address, "seeded dev cardano chain");
            }
            ChainConfig::Evm(_) => {
                bridge.with_state(|state| {
                    state
                        .evm_keys
                        .insert(chain_id.clone(), Buf32([dev.wallet_seed; 32]));
                    state.confirmed.insert(
                        chain_id.clone(),
                        vec![dev_transfer(
                            &chain_id,
                            format!("0x{}", "21".repeat(20)),
                            dev.funding / 20,
                        )],
                    );
                });
                info!(%chain_id, "seeded dev evm chain");
            }
        }
    }

    Ok(bridge)
}

/// One pending transfer so a fresh dev run produces a batch immediately.
fn dev_transfer(chain_id: &ChainId, address: String, amount: u64) -> ConfirmedTransaction {
    ConfirmedTransaction {
        source_chain_id: chain_id.clone(),
        observed_tx_hash: Buf32([0x21; 32]),
        nonce: 1,
        tx_type: TransactionType::Normal,
        receivers: vec![BridgeReceiver {
            address,
            amount,
            wrapped_amount: 0,
            token_id: 0,
        }],
    }
}
