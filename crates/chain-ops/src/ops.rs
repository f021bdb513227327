//! The polymorphic chain-operations contract and its factory.

use std::sync::Arc;

use async_trait::async_trait;
use corridor_primitives::{
    batch::{BatchSignatures, GeneratedBatchTx},
    bridge::ValidatorTable,
    chain::ChainId,
    tx::ConfirmedTransaction,
};

use crate::{
    cardano::{CardanoChainOperations, CardanoOpsConfig},
    errors::ChainOpsResult,
    evm::{EvmChainOperations, EvmOpsConfig},
    faults::FaultPlan,
    traits::{BridgeContract, Indexer, SecretsManager, SignedBatch},
};

/// The four operations every destination-chain strategy implements.
///
/// One instance serves exactly one chain and is owned by that chain's
/// batching loop; `submit_batch` takes `&mut self` because the EVM strategy
/// updates its gas window across submissions.
#[async_trait]
pub trait ChainOperations: Send + Sync {
    /// The chain this strategy serves.
    fn chain_id(&self) -> &ChainId;

    /// Builds the unsigned batch transaction for the confirmed transfers.
    ///
    /// Must be bit-deterministic: every validator calling this with the same
    /// arguments and chain state gets the same bytes and hash.
    async fn generate_batch(
        &self,
        batch_id: u64,
        confirmed: &[ConfirmedTransaction],
        validators: &ValidatorTable,
    ) -> ChainOpsResult<GeneratedBatchTx>;

    /// Produces this validator's signature(s) over a generated batch.
    fn sign_batch(&self, tx: &GeneratedBatchTx) -> ChainOpsResult<BatchSignatures>;

    /// Whether the local indexer has caught up with the bridge contract's
    /// view of this chain.
    async fn is_synchronized(&self) -> ChainOpsResult<bool>;

    /// Forwards a signed batch to the bridge contract.
    async fn submit_batch(&mut self, batch: SignedBatch) -> ChainOpsResult<()>;
}

/// Configuration selecting and parameterizing one chain's strategy.
#[derive(Clone, Debug)]
pub enum OpsConfig {
    /// A Cardano-style chain, reactor or skyline.
    Cardano(CardanoOpsConfig),
    /// An EVM chain.
    Evm(EvmOpsConfig),
}

impl OpsConfig {
    /// The chain this configuration is for.
    pub fn chain_id(&self) -> &ChainId {
        match self {
            Self::Cardano(config) => &config.chain_id,
            Self::Evm(config) => &config.chain_id,
        }
    }
}

/// Instantiates the strategy for one configured chain.
pub fn create_chain_operations(
    config: OpsConfig,
    contract: Arc<dyn BridgeContract>,
    indexer: Arc<dyn Indexer>,
    secrets: &dyn SecretsManager,
    faults: Option<Arc<FaultPlan>>,
) -> ChainOpsResult<Box<dyn ChainOperations>> {
    match config {
        OpsConfig::Cardano(config) => Ok(Box::new(CardanoChainOperations::new(
            config, contract, indexer, secrets, faults,
        )?)),
        OpsConfig::Evm(config) => Ok(Box::new(EvmChainOperations::new(
            config, contract, indexer, secrets, faults,
        )?)),
    }
}
