//! Aggregation of confirmed transfer requests into destination outputs.
//!
//! Many confirmed transactions collapse into one deduplicated output list:
//! amounts owed to the same address merge, wrapped amounts convert into
//! destination-chain tokens, and receivers that cannot be paid (zero amount,
//! wrong-network address) are dropped with a warning rather than failing the
//! batch. The surviving outputs are sorted ascending by address string; that
//! ordering is what lets every validator encode the same bytes.

use std::collections::BTreeMap;

use corridor_primitives::{
    asset::{AssetId, SumMap, TokenAmount},
    errors::AmountError,
    tx::{ConfirmedTransaction, TransactionType, TxOutput},
};
use tracing::warn;

use crate::{cardano::address::validate_address, context::AggregatorContext, errors::TxBuilderResult};

/// The deduplicated, ordered outputs of one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregatedOutputs {
    /// Outputs sorted ascending by address, no duplicate addresses.
    pub outputs: Vec<TxOutput>,
    /// Total owed per asset across all outputs.
    pub sums: SumMap,
    /// Whether any aggregated transaction was a token redistribution.
    pub is_redistribution: bool,
}

/// Amounts accumulated for one destination address before filtering.
#[derive(Default)]
struct AddressSlot {
    amount: u64,
    tokens: BTreeMap<(String, String), u64>,
}

/// Collapses `confirmed` into one output list per the batch's chain config.
///
/// Transactions are visited in their given order; accumulation is keyed by
/// destination address in a `BTreeMap`, so the emitted outputs come out in
/// address order without a separate sort step. Informational transaction
/// types (stake operations) contribute no receivers. A redistribution
/// transaction flags the whole batch but aggregates identically.
pub fn aggregate_outputs(
    confirmed: &[ConfirmedTransaction],
    ctx: &AggregatorContext,
) -> TxBuilderResult<AggregatedOutputs> {
    let mut slots: BTreeMap<String, AddressSlot> = BTreeMap::new();
    let mut is_redistribution = false;

    for tx in confirmed {
        if tx.tx_type.is_informational() {
            continue;
        }
        if tx.tx_type == TransactionType::Redistribution {
            is_redistribution = true;
        }

        for receiver in &tx.receivers {
            let slot = slots.entry(receiver.address.clone()).or_default();
            slot.amount =
                slot.amount
                    .checked_add(receiver.amount)
                    .ok_or_else(|| AmountError::Overflow {
                        asset: AssetId::Base.to_string(),
                    })?;

            if receiver.wrapped_amount > 0 {
                let token = ctx.exchange.wrapped_token(&tx.source_chain_id)?;
                let entry = slot
                    .tokens
                    .entry((token.policy.clone(), token.name.clone()))
                    .or_insert(0);
                *entry = entry.checked_add(receiver.wrapped_amount).ok_or_else(|| {
                    AmountError::Overflow {
                        asset: token.asset_id().to_string(),
                    }
                })?;
            }
        }
    }

    let mut outputs = Vec::with_capacity(slots.len());
    let mut sums = SumMap::new();
    for (address, slot) in slots {
        if slot.amount == 0 {
            // Expected when a transfer nets out to nothing; not a failure.
            warn!(%address, "dropping aggregated output with zero amount");
            continue;
        }
        if !validate_address(&address, ctx.network) {
            warn!(%address, "dropping aggregated output with invalid address");
            continue;
        }

        sums.add(AssetId::Base, slot.amount)?;
        let mut tokens = Vec::with_capacity(slot.tokens.len());
        for ((policy, name), amount) in slot.tokens {
            sums.add(AssetId::token(policy.clone(), name.clone()), amount)?;
            tokens.push(TokenAmount::new(policy, name, amount));
        }
        tokens.sort_by_key(TokenAmount::token_name);

        let amount = slot.amount;
        outputs.push(TxOutput {
            address,
            amount,
            tokens,
        });
    }

    Ok(AggregatedOutputs {
        outputs,
        sums,
        is_redistribution,
    })
}
