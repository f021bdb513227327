//! In-memory implementation of the external-interface traits.
//!
//! Backs loop-level tests and the binary's dev backend: seed a
//! [`BridgeState`], hand the same instance to the batcher as contract,
//! indexer and secrets manager, and inspect what got submitted. State
//! mutations go through [`InMemoryBridge::with_state`], so a test can move
//! the tip or inject failures between ticks.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use corridor_chain_ops::{
    errors::RpcError,
    traits::{
        BridgeContract, CardanoWallet, Indexer, ProtocolParams, RpcResult, SecretsManager,
        SignedBatch,
    },
};
use corridor_primitives::{
    bridge::ValidatorTable,
    buf::Buf32,
    chain::{BlockPoint, ChainId},
    tx::{ConfirmedTransaction, Utxo},
};

/// Mutable world state served by [`InMemoryBridge`].
#[derive(Clone, Debug)]
pub struct BridgeState {
    /// Answer to `should_create_batch`.
    pub should_create: bool,
    /// Id handed out for the next batch.
    pub next_batch_id: u64,
    /// Confirmed transfers pending batching, per destination chain.
    pub confirmed: BTreeMap<ChainId, Vec<ConfirmedTransaction>>,
    /// Current validator committee.
    pub validators: ValidatorTable,
    /// Last source block the contract observed.
    pub last_observed: u64,
    /// Latest point the indexer has processed.
    pub tip: BlockPoint,
    /// Spendable UTXOs per address.
    pub utxos: BTreeMap<String, Vec<Utxo>>,
    /// Raw transaction bytes the indexer can look up by hash.
    pub raw_txs: BTreeMap<Buf32, Vec<u8>>,
    /// Protocol parameters served by the indexer.
    pub params: ProtocolParams,
    /// Cardano wallets by chain id.
    pub wallets: BTreeMap<ChainId, CardanoWallet>,
    /// EVM signing keys by chain id.
    pub evm_keys: BTreeMap<ChainId, Buf32>,
    /// Batches received by `submit_signed_batch`.
    pub submitted: Vec<SignedBatch>,
    /// When set, every contract and indexer call fails as transient.
    pub rpc_down: bool,
    /// Number of upcoming submissions to reject.
    pub fail_next_submissions: u32,
}

impl Default for BridgeState {
    fn default() -> Self {
        Self {
            should_create: true,
            next_batch_id: 1,
            confirmed: BTreeMap::new(),
            validators: std::iter::empty().collect(),
            last_observed: 0,
            tip: BlockPoint::new(0, Buf32::zero()),
            utxos: BTreeMap::new(),
            raw_txs: BTreeMap::new(),
            params: ProtocolParams {
                min_utxo: 1_000_000,
                max_tx_size: 16_384,
                batch_fee: 200_000,
            },
            wallets: BTreeMap::new(),
            evm_keys: BTreeMap::new(),
            submitted: Vec::new(),
            rpc_down: false,
            fail_next_submissions: 0,
        }
    }
}

/// Shared in-memory backend; clone the [`Arc`] for each role it plays.
#[derive(Debug)]
pub struct InMemoryBridge {
    state: Mutex<BridgeState>,
}

impl InMemoryBridge {
    /// Wraps a seeded state.
    pub fn new(state: BridgeState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BridgeState) -> R) -> R {
        f(&mut self.state.lock().expect("bridge state poisoned"))
    }

    /// The batches submitted so far.
    pub fn submitted(&self) -> Vec<SignedBatch> {
        self.with_state(|state| state.submitted.clone())
    }

    fn read<R>(&self, f: impl FnOnce(&BridgeState) -> R) -> RpcResult<R> {
        let state = self.state.lock().expect("bridge state poisoned");
        if state.rpc_down {
            return Err(RpcError::new("in-memory backend marked down"));
        }
        Ok(f(&state))
    }
}

#[async_trait]
impl BridgeContract for InMemoryBridge {
    async fn should_create_batch(&self, _chain: &ChainId) -> RpcResult<bool> {
        self.read(|state| state.should_create)
    }

    async fn next_batch_id(&self, _chain: &ChainId) -> RpcResult<u64> {
        self.read(|state| state.next_batch_id)
    }

    async fn confirmed_transactions(
        &self,
        chain: &ChainId,
    ) -> RpcResult<Vec<ConfirmedTransaction>> {
        self.read(|state| state.confirmed.get(chain).cloned().unwrap_or_default())
    }

    async fn validator_set(&self, _chain: &ChainId) -> RpcResult<ValidatorTable> {
        self.read(|state| state.validators.clone())
    }

    async fn last_observed_block(&self, _chain: &ChainId) -> RpcResult<u64> {
        self.read(|state| state.last_observed)
    }

    async fn submit_signed_batch(&self, batch: SignedBatch) -> RpcResult<()> {
        let mut state = self.state.lock().expect("bridge state poisoned");
        if state.rpc_down {
            return Err(RpcError::new("in-memory backend marked down"));
        }
        if state.fail_next_submissions > 0 {
            state.fail_next_submissions -= 1;
            return Err(RpcError::new("scripted submission failure"));
        }
        state.next_batch_id += 1;
        // A submitted batch covers the chain's pending transfers.
        state.confirmed.remove(&batch.chain_id);
        state.submitted.push(batch);
        Ok(())
    }
}

#[async_trait]
impl Indexer for InMemoryBridge {
    async fn utxos_at(&self, address: &str) -> RpcResult<Vec<Utxo>> {
        self.read(|state| state.utxos.get(address).cloned().unwrap_or_default())
    }

    async fn latest_point(&self) -> RpcResult<BlockPoint> {
        self.read(|state| state.tip)
    }

    async fn tx_by_hash(&self, tx_hash: &Buf32) -> RpcResult<Option<Vec<u8>>> {
        self.read(|state| state.raw_txs.get(tx_hash).cloned())
    }

    async fn protocol_params(&self) -> RpcResult<ProtocolParams> {
        self.read(|state| state.params)
    }
}

impl SecretsManager for InMemoryBridge {
    fn cardano_wallet(&self, chain: &ChainId) -> RpcResult<CardanoWallet> {
        self.read(|state| state.wallets.get(chain).copied())?
            .ok_or_else(|| RpcError::new(format!("no cardano wallet for chain {chain}")))
    }

    fn evm_key(&self, chain: &ChainId) -> RpcResult<Buf32> {
        self.read(|state| state.evm_keys.get(chain).copied())?
            .ok_or_else(|| RpcError::new(format!("no evm key for chain {chain}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::{seeded_wallet, utxo};

    #[tokio::test]
    async fn serves_and_mutates_state() {
        let chain = ChainId::from("cardano-prime");
        let bridge = InMemoryBridge::new(BridgeState::default());
        bridge.with_state(|state| {
            state.utxos.insert("addr".to_string(), vec![utxo(1, 0, 5)]);
            state.wallets.insert(chain.clone(), seeded_wallet(1).0);
            state.tip = BlockPoint::new(42, Buf32([1; 32]));
        });

        assert_eq!(bridge.utxos_at("addr").await.unwrap().len(), 1);
        assert_eq!(bridge.latest_point().await.unwrap().number, 42);
        assert!(bridge.cardano_wallet(&chain).is_ok());
        assert!(bridge.evm_key(&chain).is_err());
        assert_eq!(bridge.tx_by_hash(&Buf32([1; 32])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rpc_down_fails_everything_transiently() {
        let bridge = InMemoryBridge::new(BridgeState::default());
        bridge.with_state(|state| state.rpc_down = true);

        assert!(bridge.latest_point().await.is_err());
        assert!(bridge
            .should_create_batch(&ChainId::from("any"))
            .await
            .is_err());
    }
}
