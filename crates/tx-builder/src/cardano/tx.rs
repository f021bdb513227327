//! Unsigned Cardano batch-transaction encoding.
//!
//! The body follows the Shelley-era CDDL: a map of `{0: inputs, 1: outputs,
//! 2: fee, 3: ttl, 7: auxiliary data hash}` wrapped in a three-element
//! transaction array with an empty witness set. Inputs are sorted by
//! `(tx_hash, index)` and multi-asset values by policy and asset-name bytes
//! before encoding; the transaction hash is Blake2b-256 over the body bytes,
//! which is exactly what every validator signs.

use std::collections::BTreeMap;

use blake2::{
    digest::{consts::U32, Digest},
    Blake2b,
};
use corridor_primitives::{
    batch::{BatchKind, GeneratedBatchTx},
    buf::Buf32,
    tx::{TxInput, TxOutput},
};

use crate::{
    cardano::{address::decode_address, cbor::Encoder},
    errors::{TxBuilderError, TxBuilderResult},
};

type Blake2b256 = Blake2b<U32>;

/// Metadata label under which a batch transaction carries its batch id.
pub const BATCH_METADATA_LABEL: u64 = 3_118;

/// Expected byte length of a decoded minting policy id.
const POLICY_ID_LEN: usize = 28;

/// Body map keys, per the transaction-body CDDL.
const KEY_INPUTS: u64 = 0;
const KEY_OUTPUTS: u64 = 1;
const KEY_FEE: u64 = 2;
const KEY_TTL: u64 = 3;
const KEY_AUX_DATA_HASH: u64 = 7;

/// Chain-level parameters of one batch transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxBuildParams {
    /// Batch id assigned by the bridge contract, tagged in the metadata.
    pub batch_id: u64,
    /// Fee the transaction declares, in base-asset units.
    pub fee: u64,
    /// Validity deadline as an absolute slot.
    pub ttl_slot: u64,
    /// Maximum encoded size the chain accepts.
    pub max_tx_size: usize,
}

/// Encodes the unsigned batch transaction and computes its hash.
///
/// `inputs` may arrive in selection order; they are re-sorted here because the
/// wire format requires canonical input order. Output order is taken as
/// given, since the aggregator already emits outputs sorted by address and
/// change outputs follow at fixed positions.
pub fn build_batch_tx(
    inputs: &[TxInput],
    outputs: &[TxOutput],
    params: &TxBuildParams,
    kind: BatchKind,
) -> TxBuilderResult<GeneratedBatchTx> {
    let mut sorted_inputs = inputs.to_vec();
    sorted_inputs.sort();

    let aux = encode_aux_data(params.batch_id);
    let aux_hash = blake2b_256(&aux);

    let mut body = Encoder::new();
    body.map(5);
    body.uint(KEY_INPUTS);
    encode_inputs(&mut body, &sorted_inputs);
    body.uint(KEY_OUTPUTS);
    encode_outputs(&mut body, outputs)?;
    body.uint(KEY_FEE).uint(params.fee);
    body.uint(KEY_TTL).uint(params.ttl_slot);
    body.uint(KEY_AUX_DATA_HASH).bytes(&aux_hash);
    let body = body.into_bytes();

    let tx_hash = Buf32(blake2b_256(&body));

    let mut tx = Encoder::new();
    tx.array(3);
    tx.raw(&body);
    tx.map(0);
    tx.raw(&aux);
    let raw_tx = tx.into_bytes();

    if raw_tx.len() > params.max_tx_size {
        return Err(TxBuilderError::TxTooLarge {
            size: raw_tx.len(),
            max: params.max_tx_size,
        });
    }

    Ok(GeneratedBatchTx {
        batch_id: params.batch_id,
        raw_tx,
        tx_hash,
        kind,
    })
}

/// Encodes the input set as `[[tx_hash, index], ...]`.
fn encode_inputs(enc: &mut Encoder, inputs: &[TxInput]) {
    enc.array(inputs.len() as u64);
    for input in inputs {
        enc.array(2)
            .bytes(input.tx_hash.as_bytes())
            .uint(u64::from(input.output_index));
    }
}

/// Encodes the output list; each output is `[address, coin]` or
/// `[address, [coin, multiasset]]`.
fn encode_outputs(enc: &mut Encoder, outputs: &[TxOutput]) -> TxBuilderResult<()> {
    enc.array(outputs.len() as u64);
    for output in outputs {
        let address = decode_address(&output.address)?;
        enc.array(2).bytes(&address);
        if output.tokens.is_empty() {
            enc.uint(output.amount);
        } else {
            enc.array(2).uint(output.amount);
            encode_multiasset(enc, output)?;
        }
    }
    Ok(())
}

/// Encodes an output's tokens as `{policy: {name: amount}}` in byte order.
fn encode_multiasset(enc: &mut Encoder, output: &TxOutput) -> TxBuilderResult<()> {
    let mut by_policy: BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, u64>> = BTreeMap::new();
    for token in &output.tokens {
        let policy = hex::decode(&token.policy).map_err(|_| TxBuilderError::InvalidPolicyId {
            policy: token.policy.clone(),
        })?;
        if policy.len() != POLICY_ID_LEN {
            return Err(TxBuilderError::InvalidPolicyId {
                policy: token.policy.clone(),
            });
        }
        *by_policy
            .entry(policy)
            .or_default()
            .entry(token.name.as_bytes().to_vec())
            .or_insert(0) += token.amount;
    }

    enc.map(by_policy.len() as u64);
    for (policy, names) in by_policy {
        enc.bytes(&policy);
        enc.map(names.len() as u64);
        for (name, amount) in names {
            enc.bytes(&name).uint(amount);
        }
    }
    Ok(())
}

/// Auxiliary data carrying the batch id: `{label: batch_id}`.
fn encode_aux_data(batch_id: u64) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.map(1).uint(BATCH_METADATA_LABEL).uint(batch_id);
    enc.into_bytes()
}

fn blake2b_256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
