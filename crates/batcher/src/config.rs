//! Deserializable batcher configuration.
//!
//! These are the TOML-facing shapes; they convert into the strategy configs
//! the chain-operations crate consumes. Keys and committees are hex strings
//! here and typed buffers after conversion.

use corridor_chain_ops::{
    cardano::CardanoOpsConfig,
    evm::EvmOpsConfig,
    gas::GasLimitConfig,
    OpsConfig,
};
use corridor_primitives::{
    bridge::{ValidatorKeys, ValidatorTable},
    buf::Buf32,
    chain::{ChainId, ChainKind},
};
use corridor_tx_builder::{
    cardano::address::CardanoNetwork,
    context::{AggregatorContext, TokenExchange},
    evm::{EvmBatchConfig, EvmTokenRegistry},
};
use serde::Deserialize;

use crate::errors::{BatcherError, BatcherResult};

/// Top-level batcher configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct BatcherConfig {
    /// Seconds between scheduling ticks, shared by every chain's loop.
    pub tick_interval_secs: u64,
    /// One entry per destination chain to operate.
    pub chains: Vec<ChainConfig>,
}

/// Configuration of one destination chain.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChainConfig {
    /// Cardano chain on the reactor protocol.
    CardanoReactor(CardanoChainConfig),
    /// Cardano chain on the skyline protocol.
    CardanoSkyline(CardanoChainConfig),
    /// EVM chain.
    Evm(EvmChainConfig),
}

/// One committee member's verification keys, hex encoded.
#[derive(Clone, Debug, Deserialize)]
pub struct CommitteeEntry {
    /// Funds-multisig verification key.
    pub funds_key: Buf32,
    /// Fee-multisig verification key.
    pub fee_key: Buf32,
}

/// Parameters shared by both Cardano protocol variants.
#[derive(Clone, Debug, Deserialize)]
pub struct CardanoChainConfig {
    /// Chain id as registered in the bridge contract.
    pub chain_id: String,
    /// Network the destination addresses must belong to.
    pub network: CardanoNetwork,
    /// Floor for the minimum-UTXO padding, in base-asset units.
    pub min_utxo: u64,
    /// Slot rounding threshold for the validity window.
    pub slot_rounding_threshold: u64,
    /// Dead-zone width around rounding boundaries, in basis points.
    pub no_batch_period_bps: u64,
    /// Maximum inputs one batch may consume.
    pub max_utxo_count: usize,
    /// Cap on fee-multisig inputs within that budget.
    pub max_fee_utxo_count: usize,
    /// Optional consolidation floor for the funds selection.
    #[serde(default)]
    pub take_at_least_utxo_count: Option<usize>,
    /// Wrapped-token conversion table keyed by source chain id.
    #[serde(default)]
    pub token_exchange: TokenExchange,
    /// Fixed committee; required for reactor, ignored by skyline.
    #[serde(default)]
    pub committee: Vec<CommitteeEntry>,
}

/// One bridged token's registry entry.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenEntry {
    /// Bridge-registry token id.
    pub id: u32,
    /// Decimal places of the token on its source ledger.
    pub decimals: u8,
}

/// Parameters of one EVM chain.
#[derive(Clone, Debug, Deserialize)]
pub struct EvmChainConfig {
    /// Chain id as registered in the bridge contract.
    pub chain_id: String,
    /// Block rounding threshold for the batch TTL.
    pub block_rounding_threshold: u64,
    /// Dead-zone width around rounding boundaries, in basis points.
    pub no_batch_period_bps: u64,
    /// Fee retained from every refund, in base-asset source units.
    pub refund_min_fee: u64,
    /// Token decimals registry; must contain the base asset (id 0).
    pub tokens: Vec<TokenEntry>,
    /// Minimum gas limit attempted on submission.
    pub gas_min: u64,
    /// Maximum gas limit attempted on submission.
    pub gas_max: u64,
    /// Gas adjustment step per submission outcome.
    pub gas_step: u64,
}

impl ChainConfig {
    /// The chain this entry configures.
    pub fn chain_id(&self) -> ChainId {
        match self {
            Self::CardanoReactor(config) | Self::CardanoSkyline(config) => {
                ChainId::new(config.chain_id.clone())
            }
            Self::Evm(config) => ChainId::new(config.chain_id.clone()),
        }
    }

    /// Converts this entry into its strategy configuration.
    pub fn to_ops_config(&self) -> BatcherResult<OpsConfig> {
        match self {
            Self::CardanoReactor(config) => {
                if config.committee.is_empty() {
                    return Err(BatcherError::InvalidConfig(format!(
                        "reactor chain {} requires a committee",
                        config.chain_id
                    )));
                }
                Ok(OpsConfig::Cardano(cardano_ops_config(
                    config,
                    ChainKind::CardanoReactor,
                    Some(committee_table(&config.committee)),
                )))
            }
            Self::CardanoSkyline(config) => Ok(OpsConfig::Cardano(cardano_ops_config(
                config,
                ChainKind::CardanoSkyline,
                None,
            ))),
            Self::Evm(config) => {
                let tokens: EvmTokenRegistry = config
                    .tokens
                    .iter()
                    .map(|entry| (entry.id, entry.decimals))
                    .collect();
                Ok(OpsConfig::Evm(EvmOpsConfig {
                    chain_id: ChainId::new(config.chain_id.clone()),
                    batch: EvmBatchConfig {
                        tokens,
                        refund_min_fee: config.refund_min_fee,
                    },
                    block_rounding_threshold: config.block_rounding_threshold,
                    no_batch_period_bps: config.no_batch_period_bps,
                    gas: GasLimitConfig {
                        min: config.gas_min,
                        max: config.gas_max,
                        step: config.gas_step,
                    },
                }))
            }
        }
    }
}

fn cardano_ops_config(
    config: &CardanoChainConfig,
    kind: ChainKind,
    fixed_committee: Option<ValidatorTable>,
) -> CardanoOpsConfig {
    CardanoOpsConfig {
        chain_id: ChainId::new(config.chain_id.clone()),
        kind,
        aggregator: AggregatorContext {
            network: config.network,
            min_utxo: config.min_utxo,
            exchange: config.token_exchange.clone(),
        },
        slot_rounding_threshold: config.slot_rounding_threshold,
        no_batch_period_bps: config.no_batch_period_bps,
        max_utxo_count: config.max_utxo_count,
        max_fee_utxo_count: config.max_fee_utxo_count,
        take_at_least_utxo_count: config.take_at_least_utxo_count,
        fixed_committee,
    }
}

fn committee_table(entries: &[CommitteeEntry]) -> ValidatorTable {
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            (
                idx as u32,
                ValidatorKeys {
                    funds_key: entry.funds_key,
                    fee_key: entry.fee_key,
                },
            )
        })
        .collect()
}
