//! EVM batch-payload construction and hashing.
//!
//! The batch is a fixed-layout struct `{nonce, ttlBlock, feeTotal,
//! receivers[]}` ABI-encoded with `alloy-sol-types` and hashed with
//! Keccak-256 under a fixed domain tag. Receivers are deduplicated by
//! `(address, token id)` and sorted the same way; amounts are normalized to
//! 18-decimal fixed point so every token settles in one unit system.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, U256};
use alloy_sol_types::{sol, SolValue};
use corridor_primitives::{
    batch::{BatchKind, GeneratedBatchTx},
    buf::Buf32,
    tx::{ConfirmedTransaction, TransactionType},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{TxBuilderError, TxBuilderResult};

sol! {
    /// One payout inside a batch.
    #[derive(Debug, PartialEq, Eq)]
    struct BatchReceiver {
        address to;
        uint32 tokenId;
        uint256 amount;
    }

    /// The batch struct the bridge contract verifies signatures over.
    #[derive(Debug, PartialEq, Eq)]
    struct BridgeBatch {
        uint64 nonce;
        uint64 ttlBlock;
        uint256 feeTotal;
        BatchReceiver[] receivers;
    }
}

/// Domain tag mixed into the batch hash before signing.
pub const BATCH_DOMAIN_TAG: &[u8] = b"corridor/evm-batch/v1";

/// Token id of the bridged base asset in the registry.
pub const BASE_TOKEN_ID: u32 = 0;

/// Fixed-point target every amount is normalized to.
const TARGET_DECIMALS: u8 = 18;

/// Decimal places registered per bridged token id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvmTokenRegistry(BTreeMap<u32, u8>);

impl EvmTokenRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token id with its decimals.
    pub fn insert(&mut self, token_id: u32, decimals: u8) {
        self.0.insert(token_id, decimals);
    }

    /// Decimals configured for a token id.
    pub fn decimals(&self, token_id: u32) -> TxBuilderResult<u8> {
        self.0
            .get(&token_id)
            .copied()
            .ok_or(TxBuilderError::UnknownToken { token_id })
    }
}

impl FromIterator<(u32, u8)> for EvmTokenRegistry {
    fn from_iter<I: IntoIterator<Item = (u32, u8)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Configuration of the EVM receiver builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmBatchConfig {
    /// Token decimals registry; must contain [`BASE_TOKEN_ID`].
    pub tokens: EvmTokenRegistry,
    /// Fee retained from every refund, in base-asset source units.
    pub refund_min_fee: u64,
}

/// The receiver list and fee total aggregated from confirmed transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvmReceivers {
    /// Deduplicated receivers sorted by `(address, token id)`.
    pub receivers: Vec<BatchReceiver>,
    /// Total fee contribution, in 18-decimal fixed point.
    pub fee_total: U256,
}

/// Builds the deduplicated receiver list for one batch.
///
/// A receiver's base amount accumulates under [`BASE_TOKEN_ID`]; a non-zero
/// wrapped amount accumulates under its own token id. Receivers addressed to
/// the zero address are pure fee contributions and never appear in the list.
/// Refund transactions keep the configured minimum fee for the fee pool and
/// pay the remainder back to the user. Malformed addresses are dropped with a
/// warning, matching the aggregation rules on the Cardano side.
pub fn build_receivers(
    confirmed: &[ConfirmedTransaction],
    config: &EvmBatchConfig,
) -> TxBuilderResult<EvmReceivers> {
    let mut merged: BTreeMap<(Address, u32), U256> = BTreeMap::new();
    let mut fee_total = U256::ZERO;

    for tx in confirmed {
        if tx.tx_type.is_informational() {
            continue;
        }
        for receiver in &tx.receivers {
            let Ok(to) = receiver.address.parse::<Address>() else {
                warn!(address = %receiver.address, "dropping receiver with invalid address");
                continue;
            };

            let base_decimals = config.tokens.decimals(BASE_TOKEN_ID)?;
            let mut base = normalize(receiver.amount, base_decimals, BASE_TOKEN_ID)?;
            if tx.tx_type == TransactionType::Refund {
                let fee = normalize(
                    receiver.amount.min(config.refund_min_fee),
                    base_decimals,
                    BASE_TOKEN_ID,
                )?;
                fee_total += fee;
                base -= fee;
            }

            if to == Address::ZERO {
                fee_total += base;
            } else if base > U256::ZERO {
                *merged.entry((to, BASE_TOKEN_ID)).or_insert(U256::ZERO) += base;
            }

            if receiver.wrapped_amount > 0 {
                let wrapped = normalize(
                    receiver.wrapped_amount,
                    config.tokens.decimals(receiver.token_id)?,
                    receiver.token_id,
                )?;
                if to == Address::ZERO {
                    fee_total += wrapped;
                } else {
                    *merged
                        .entry((to, receiver.token_id))
                        .or_insert(U256::ZERO) += wrapped;
                }
            }
        }
    }

    let receivers = merged
        .into_iter()
        .map(|((to, token_id), amount)| BatchReceiver {
            to,
            tokenId: token_id,
            amount,
        })
        .collect();

    Ok(EvmReceivers {
        receivers,
        fee_total,
    })
}

/// ABI-encodes the batch and hashes it under the domain tag.
pub fn encode_batch(
    batch_id: u64,
    ttl_block: u64,
    receivers: EvmReceivers,
    kind: BatchKind,
) -> GeneratedBatchTx {
    let batch = BridgeBatch {
        nonce: batch_id,
        ttlBlock: ttl_block,
        feeTotal: receivers.fee_total,
        receivers: receivers.receivers,
    };
    let raw_tx = batch.abi_encode();

    let mut preimage = Vec::with_capacity(BATCH_DOMAIN_TAG.len() + raw_tx.len());
    preimage.extend_from_slice(BATCH_DOMAIN_TAG);
    preimage.extend_from_slice(&raw_tx);
    let tx_hash = Buf32(keccak256(&preimage).0);

    GeneratedBatchTx {
        batch_id,
        raw_tx,
        tx_hash,
        kind,
    }
}

/// Scales a source-unit amount up to 18-decimal fixed point.
fn normalize(amount: u64, decimals: u8, token_id: u32) -> TxBuilderResult<U256> {
    if decimals > TARGET_DECIMALS {
        return Err(TxBuilderError::UnsupportedDecimals { token_id, decimals });
    }
    let scale = U256::from(10u64).pow(U256::from(TARGET_DECIMALS - decimals));
    Ok(U256::from(amount) * scale)
}
