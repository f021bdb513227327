//! Interfaces to the external collaborators of the batching loops.
//!
//! The bridge contract, the indexer database and the secrets manager are all
//! injected as traits; their concrete RPC clients live outside this
//! component. Everything returns [`RpcError`] on transport failure so the
//! loop can classify it as transient.

use async_trait::async_trait;
use corridor_primitives::{
    bridge::ValidatorTable,
    buf::Buf32,
    chain::{BlockPoint, ChainId},
    tx::{ConfirmedTransaction, Utxo},
};
#[cfg(test)]
use mockall::automock;

use crate::errors::RpcError;
use corridor_primitives::batch::{BatchSignatures, GeneratedBatchTx};

/// Result of a call to an external collaborator.
pub type RpcResult<T> = Result<T, RpcError>;

/// Protocol parameters of a Cardano destination chain, as served by the
/// indexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Minimum base-asset amount an output must carry.
    pub min_utxo: u64,
    /// Maximum accepted transaction size in bytes.
    pub max_tx_size: usize,
    /// Declared fee for a batch transaction.
    pub batch_fee: u64,
}

/// A batch with the signature set collected so far, ready for submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedBatch {
    /// Chain the batch settles on.
    pub chain_id: ChainId,
    /// The unsigned transaction and its hash.
    pub tx: GeneratedBatchTx,
    /// Validator signatures over the transaction hash.
    pub signatures: Vec<BatchSignatures>,
    /// Gas limit chosen by the adaptive limiter; `None` on Cardano chains.
    pub gas_limit: Option<u64>,
}

/// Read/write surface of the on-chain bridge contract.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BridgeContract: Send + Sync {
    /// Whether the contract wants a batch created for `chain` right now.
    async fn should_create_batch(&self, chain: &ChainId) -> RpcResult<bool>;

    /// The id the next batch for `chain` must carry.
    async fn next_batch_id(&self, chain: &ChainId) -> RpcResult<u64>;

    /// Transfer requests confirmed for `chain`, in confirmation order.
    async fn confirmed_transactions(&self, chain: &ChainId)
        -> RpcResult<Vec<ConfirmedTransaction>>;

    /// The current validator committee for `chain`.
    async fn validator_set(&self, chain: &ChainId) -> RpcResult<ValidatorTable>;

    /// The last source block the contract has observed for `chain`.
    async fn last_observed_block(&self, chain: &ChainId) -> RpcResult<u64>;

    /// Submits this validator's signed batch (or the combined batch once the
    /// threshold is reached).
    async fn submit_signed_batch(&self, batch: SignedBatch) -> RpcResult<()>;
}

/// Read-only view of the chain indexer database.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Spendable UTXOs currently held at `address`.
    async fn utxos_at(&self, address: &str) -> RpcResult<Vec<Utxo>>;

    /// The latest block point (or slot) the indexer has processed.
    async fn latest_point(&self) -> RpcResult<BlockPoint>;

    /// Raw bytes of an indexed transaction, `None` if the hash is unknown.
    async fn tx_by_hash(&self, tx_hash: &Buf32) -> RpcResult<Option<Vec<u8>>>;

    /// Current protocol parameters of the indexed chain.
    async fn protocol_params(&self) -> RpcResult<ProtocolParams>;
}

/// This validator's Cardano signing keys, one per multisig.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardanoWallet {
    /// Ed25519 signing key for the funds multisig.
    pub funds_skey: Buf32,
    /// Ed25519 signing key for the fee-payer multisig.
    pub fee_skey: Buf32,
}

/// Loads this validator's signing keys. Never writes.
#[cfg_attr(test, automock)]
pub trait SecretsManager: Send + Sync {
    /// The Cardano wallet registered for `chain`.
    fn cardano_wallet(&self, chain: &ChainId) -> RpcResult<CardanoWallet>;

    /// The secp256k1 signing key registered for `chain`.
    fn evm_key(&self, chain: &ChainId) -> RpcResult<Buf32>;
}
