//! Chain operations for EVM destination chains.
//!
//! The batch is an ABI-encoded struct rather than a ledger transaction: the
//! receiver list is built and normalized by the shared builder, the TTL is a
//! destination block number derived with the same rounding-threshold rule the
//! Cardano path uses for slots, and the single signature is recoverable ECDSA
//! over the domain-tagged Keccak hash.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use corridor_primitives::{
    batch::{BatchKind, BatchSignatures, GeneratedBatchTx},
    bridge::ValidatorTable,
    chain::ChainId,
    rounding::round_with_threshold,
    tx::ConfirmedTransaction,
};
use corridor_tx_builder::evm::{build_receivers, encode_batch, EvmBatchConfig};
use secp256k1::{Message, SecretKey, SECP256K1};
use tracing::{debug, info, warn};

use crate::{
    errors::{ChainOpsError, ChainOpsResult},
    faults::FaultPlan,
    gas::{GasLimitConfig, GasLimitHolder},
    ops::ChainOperations,
    traits::{BridgeContract, Indexer, SecretsManager, SignedBatch},
};

/// Offset added to the recovery id in the serialized signature, following the
/// convention EVM contracts expect in `v`.
const RECOVERY_ID_OFFSET: u8 = 27;

/// Configuration of one EVM chain's operations.
#[derive(Clone, Debug)]
pub struct EvmOpsConfig {
    /// Chain this strategy serves.
    pub chain_id: ChainId,
    /// Receiver normalization and refund-fee configuration.
    pub batch: EvmBatchConfig,
    /// Block rounding threshold for the batch TTL.
    pub block_rounding_threshold: u64,
    /// Dead-zone width around rounding boundaries, in basis points.
    pub no_batch_period_bps: u64,
    /// Gas-limit search window for submissions.
    pub gas: GasLimitConfig,
}

/// Batch operations for one EVM destination chain.
pub struct EvmChainOperations {
    config: EvmOpsConfig,
    contract: Arc<dyn BridgeContract>,
    indexer: Arc<dyn Indexer>,
    signing_key: SecretKey,
    gas: GasLimitHolder,
    faults: Option<Arc<FaultPlan>>,
}

impl fmt::Debug for EvmChainOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EvmChainOperations({})", self.config.chain_id)
    }
}

impl EvmChainOperations {
    /// Builds the strategy, loading this validator's signing key.
    pub fn new(
        config: EvmOpsConfig,
        contract: Arc<dyn BridgeContract>,
        indexer: Arc<dyn Indexer>,
        secrets: &dyn SecretsManager,
        faults: Option<Arc<FaultPlan>>,
    ) -> ChainOpsResult<Self> {
        let key = secrets.evm_key(&config.chain_id)?;
        let signing_key = SecretKey::from_slice(key.as_bytes()).map_err(|_| {
            ChainOpsError::FatalConfiguration(format!(
                "invalid secp256k1 signing key for chain {}",
                config.chain_id
            ))
        })?;
        let gas = GasLimitHolder::new(config.gas);

        Ok(Self {
            config,
            contract,
            indexer,
            signing_key,
            gas,
            faults,
        })
    }

    /// The gas limit the next submission will carry.
    pub fn current_gas_limit(&self) -> u64 {
        self.gas.current()
    }
}

#[async_trait]
impl ChainOperations for EvmChainOperations {
    fn chain_id(&self) -> &ChainId {
        &self.config.chain_id
    }

    async fn generate_batch(
        &self,
        batch_id: u64,
        confirmed: &[ConfirmedTransaction],
        _validators: &ValidatorTable,
    ) -> ChainOpsResult<GeneratedBatchTx> {
        if let Some(faults) = &self.faults {
            if faults.take_ttl_failure() {
                return Err(ChainOpsError::NonActiveBatchPeriod {
                    value: 0,
                    threshold: self.config.block_rounding_threshold,
                });
            }
        }

        let tip = self.indexer.latest_point().await?;
        let ttl_block = round_with_threshold(
            tip.number,
            self.config.block_rounding_threshold,
            self.config.no_batch_period_bps,
        )?;

        let receivers = build_receivers(confirmed, &self.config.batch)?;
        if receivers.receivers.is_empty() && receivers.fee_total.is_zero() {
            return Err(ChainOpsError::EmptyBatch);
        }

        let tx = encode_batch(batch_id, ttl_block, receivers, BatchKind::Bridging);
        debug!(
            batch_id,
            ttl_block,
            size = tx.raw_tx.len(),
            "generated evm batch payload"
        );
        Ok(tx)
    }

    fn sign_batch(&self, tx: &GeneratedBatchTx) -> ChainOpsResult<BatchSignatures> {
        let message = Message::from_digest(*tx.tx_hash.as_bytes());
        let signature = SECP256K1.sign_ecdsa_recoverable(&message, &self.signing_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut bytes = compact.to_vec();
        bytes.push(RECOVERY_ID_OFFSET + recovery_id.to_i32() as u8);

        Ok(BatchSignatures {
            tx_hash: tx.tx_hash,
            funds: bytes,
            fee: None,
        })
    }

    async fn is_synchronized(&self) -> ChainOpsResult<bool> {
        let point = self.indexer.latest_point().await?;
        let contract_block = self
            .contract
            .last_observed_block(&self.config.chain_id)
            .await?;
        Ok(point.number >= contract_block)
    }

    async fn submit_batch(&mut self, mut batch: SignedBatch) -> ChainOpsResult<()> {
        batch.gas_limit = Some(self.gas.current());
        match self.contract.submit_signed_batch(batch).await {
            Ok(()) => {
                self.gas.on_success();
                info!(chain = %self.config.chain_id, "submitted signed evm batch");
                Ok(())
            }
            Err(err) => {
                self.gas.on_failure();
                warn!(
                    chain = %self.config.chain_id,
                    gas_limit = self.gas.current(),
                    "evm batch submission failed, widened gas window"
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use corridor_primitives::{buf::Buf32, chain::BlockPoint};
    use corridor_test_utils::gen::confirmed_evm_transfer;
    use corridor_tx_builder::evm::{EvmTokenRegistry, BASE_TOKEN_ID};
    use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};

    use super::*;
    use crate::{
        errors::RpcError,
        traits::{MockBridgeContract, MockIndexer, MockSecretsManager},
    };

    const CHAIN: &str = "evm-prime";

    fn config() -> EvmOpsConfig {
        let tokens: EvmTokenRegistry = [(BASE_TOKEN_ID, 6u8)].into_iter().collect();
        EvmOpsConfig {
            chain_id: ChainId::from(CHAIN),
            batch: EvmBatchConfig {
                tokens,
                refund_min_fee: 2,
            },
            block_rounding_threshold: 60,
            no_batch_period_bps: 1_250,
            gas: GasLimitConfig {
                min: 100_000,
                max: 200_000,
                step: 25_000,
            },
        }
    }

    fn secrets() -> MockSecretsManager {
        let mut secrets = MockSecretsManager::new();
        secrets
            .expect_evm_key()
            .returning(|_| Ok(Buf32([7; 32])));
        secrets
    }

    fn indexer(tip_block: u64) -> MockIndexer {
        let mut indexer = MockIndexer::new();
        indexer
            .expect_latest_point()
            .returning(move || Ok(BlockPoint::new(tip_block, Buf32([9; 32]))));
        indexer
    }

    fn make_ops(contract: MockBridgeContract, tip_block: u64) -> EvmChainOperations {
        EvmChainOperations::new(
            config(),
            Arc::new(contract),
            Arc::new(indexer(tip_block)),
            &secrets(),
            None,
        )
        .unwrap()
    }

    fn validators() -> ValidatorTable {
        std::iter::empty().collect()
    }

    #[tokio::test]
    async fn ttl_uses_block_rounding() {
        let ops = make_ops(MockBridgeContract::new(), 75);
        let transfers = vec![confirmed_evm_transfer(CHAIN, 0x11, 100)];

        let tx = ops
            .generate_batch(4, &transfers, &validators())
            .await
            .unwrap();

        // Batch ids and sizes aside, the only ttl the encoder could have seen
        // for tip 75 and threshold 60 is 120; changing the tip changes bytes.
        let other = make_ops(MockBridgeContract::new(), 130);
        let moved = other
            .generate_batch(4, &transfers, &validators())
            .await
            .unwrap();
        assert_ne!(tx.tx_hash, moved.tx_hash);
    }

    #[tokio::test]
    async fn empty_receiver_list_defers_the_batch() {
        let ops = make_ops(MockBridgeContract::new(), 75);

        let err = ops.generate_batch(4, &[], &validators()).await.unwrap_err();

        assert!(matches!(err, ChainOpsError::EmptyBatch));
        assert!(err.is_wait());
    }

    #[tokio::test]
    async fn signature_recovers_to_the_signing_key() {
        let ops = make_ops(MockBridgeContract::new(), 75);
        let tx = GeneratedBatchTx {
            batch_id: 1,
            raw_tx: vec![1, 2, 3],
            tx_hash: Buf32([5; 32]),
            kind: BatchKind::Bridging,
        };

        let signatures = ops.sign_batch(&tx).unwrap();
        assert_eq!(signatures.funds.len(), 65);
        assert!(signatures.fee.is_none());

        let recovery_id =
            RecoveryId::from_i32((signatures.funds[64] - RECOVERY_ID_OFFSET) as i32).unwrap();
        let signature =
            RecoverableSignature::from_compact(&signatures.funds[..64], recovery_id).unwrap();
        let message = Message::from_digest(*tx.tx_hash.as_bytes());
        let recovered = SECP256K1.recover_ecdsa(&message, &signature).unwrap();

        assert_eq!(
            recovered,
            ops.signing_key.public_key(SECP256K1)
        );
    }

    #[tokio::test]
    async fn gas_window_tracks_submission_outcomes() {
        let mut contract = MockBridgeContract::new();
        let mut fail_first = true;
        contract.expect_submit_signed_batch().returning(move |_| {
            if fail_first {
                fail_first = false;
                Err(RpcError::new("nonce too low"))
            } else {
                Ok(())
            }
        });
        let mut ops = make_ops(contract, 75);
        let batch = SignedBatch {
            chain_id: ChainId::from(CHAIN),
            tx: GeneratedBatchTx {
                batch_id: 1,
                raw_tx: vec![1],
                tx_hash: Buf32([5; 32]),
                kind: BatchKind::Bridging,
            },
            signatures: Vec::new(),
            gas_limit: None,
        };

        assert_eq!(ops.current_gas_limit(), 100_000);
        ops.submit_batch(batch.clone()).await.unwrap_err();
        assert_eq!(ops.current_gas_limit(), 125_000);
        ops.submit_batch(batch).await.unwrap();
        assert_eq!(ops.current_gas_limit(), 100_000);
    }
}
