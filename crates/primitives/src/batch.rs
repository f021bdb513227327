//! Batch artifacts produced by the chain-operations strategies.

use serde::{Deserialize, Serialize};

use crate::buf::{Buf32, Buf64};

/// What a generated batch transaction does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchKind {
    /// Ordinary bridging batch paying out confirmed transfers.
    Bridging,
    /// Out-of-band UTXO consolidation batch.
    Consolidation,
    /// Token redistribution across validator-owned addresses.
    Redistribution,
}

/// An unsigned batch transaction plus the hash every validator signs.
///
/// Immutable after creation; the signer consumes it as-is. The raw bytes and
/// hash must be bit-identical across validators or threshold signing fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBatchTx {
    /// Batch id assigned by the bridge contract.
    pub batch_id: u64,
    /// Raw unsigned transaction bytes (Cardano CBOR or EVM ABI payload).
    pub raw_tx: Vec<u8>,
    /// Hash of the unsigned transaction.
    pub tx_hash: Buf32,
    /// What this batch does.
    pub kind: BatchKind,
}

/// This validator's signature(s) over a generated batch.
///
/// The Cardano reactor model signs twice, once per multisig (funds and
/// fee-payer); the EVM model produces a single recoverable ECDSA signature
/// carried in `funds` with `fee` unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSignatures {
    /// Hash the signatures commit to.
    pub tx_hash: Buf32,
    /// Signature over the funds multisig (or the sole EVM signature bytes).
    pub funds: Vec<u8>,
    /// Signature over the fee-payer multisig, when the model uses one.
    pub fee: Option<Buf64>,
}
