//! Transaction snapshots exchanged with the bridge contract and the indexer.

use serde::{Deserialize, Serialize};

use crate::{
    asset::{AssetId, SumMap, TokenAmount},
    buf::Buf32,
    chain::ChainId,
    errors::AmountError,
};

/// A spendable output as reported by the indexer.
///
/// UTXOs are read-only snapshots; the selection engine only ever picks or
/// rejects them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Hash of the transaction that created this output.
    pub tx_hash: Buf32,
    /// Output index within that transaction.
    pub output_index: u32,
    /// Base-asset amount held by the output.
    pub amount: u64,
    /// Native tokens held by the output, if any.
    pub tokens: Vec<TokenAmount>,
}

impl Utxo {
    /// The `(tx_hash, index)` pair identifying this output.
    pub fn key(&self) -> (Buf32, u32) {
        (self.tx_hash, self.output_index)
    }

    /// Sums this UTXO's holdings into a fresh [`SumMap`].
    pub fn asset_sums(&self) -> Result<SumMap, AmountError> {
        let mut sums = SumMap::new();
        sums.add(AssetId::Base, self.amount)?;
        for token in &self.tokens {
            sums.add(token.asset_id(), token.amount)?;
        }
        Ok(sums)
    }

    /// Whether the UTXO carries any token not present in `known`.
    ///
    /// Inputs with unrecognized tokens are excluded from selection so a batch
    /// never moves assets the bridge does not track.
    pub fn has_unknown_tokens(&self, known: &[AssetId]) -> bool {
        self.tokens
            .iter()
            .any(|token| !known.contains(&token.asset_id()))
    }
}

/// A transaction input referencing a previously selected [`Utxo`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxInput {
    /// Hash of the transaction that created the consumed output.
    pub tx_hash: Buf32,
    /// Output index within that transaction.
    pub output_index: u32,
}

impl From<&Utxo> for TxInput {
    fn from(utxo: &Utxo) -> Self {
        Self {
            tx_hash: utxo.tx_hash,
            output_index: utxo.output_index,
        }
    }
}

/// Chain-native inputs produced from a chosen UTXO subset, with their total.
///
/// Input order is preserved as given by the caller; encoders re-sort for
/// determinism where the wire format requires it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxInputs {
    /// The inputs, in selection order.
    pub inputs: Vec<TxInput>,
    /// Total value carried by the inputs, per asset.
    pub sum: SumMap,
}

/// A destination-chain output owed to one address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Destination address.
    pub address: String,
    /// Base-asset amount.
    pub amount: u64,
    /// Token amounts, sorted by canonical token name.
    pub tokens: Vec<TokenAmount>,
}

impl TxOutput {
    /// Creates a token-free output.
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
            tokens: Vec::new(),
        }
    }
}

/// Kind of a bridge-confirmed transfer request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    /// Ordinary bridging transfer.
    Normal,
    /// Refund of a failed or rejected transfer back to the sender.
    Refund,
    /// Stake-registration notice; informational, carries no receivers.
    StakeRegistration,
    /// Stake-delegation notice; informational, carries no receivers.
    StakeDelegation,
    /// Token redistribution across validator-owned addresses.
    Redistribution,
}

impl TransactionType {
    /// Informational types contribute no outputs to a batch.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::StakeRegistration | Self::StakeDelegation)
    }
}

/// One receiver entry inside a confirmed transfer request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReceiver {
    /// Destination address on the batch's chain.
    pub address: String,
    /// Base-asset amount owed.
    pub amount: u64,
    /// Wrapped-token amount owed, zero when the transfer is base-asset only.
    pub wrapped_amount: u64,
    /// Bridge-registry id of the wrapped token.
    pub token_id: u32,
}

/// A transfer request the bridge contract has confirmed as source-finalized.
///
/// Immutable once read; owned by the caller for the duration of one
/// batch-build call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedTransaction {
    /// Chain the transfer originated on.
    pub source_chain_id: ChainId,
    /// Hash of the observed source transaction.
    pub observed_tx_hash: Buf32,
    /// Bridge-contract nonce of the confirmation.
    pub nonce: u64,
    /// Transfer kind.
    pub tx_type: TransactionType,
    /// Ordered receiver list.
    pub receivers: Vec<BridgeReceiver>,
}
