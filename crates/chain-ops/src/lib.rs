//! Chain-operations strategies for the corridor batcher.
//!
//! One implementation per destination-chain family: Cardano (reactor and
//! skyline protocol variants) and EVM. Each strategy composes the shared
//! output aggregator, policy resolver and selection engine with its
//! chain-specific encoder, and exposes the same four operations: generate an
//! unsigned batch, sign it, check destination-chain synchronization, and
//! submit the combined signed batch.

pub mod cardano;
pub mod errors;
pub mod evm;
pub mod faults;
pub mod gas;
pub mod ops;
pub mod traits;

pub use errors::{ChainOpsError, ChainOpsResult, RpcError};
pub use ops::{create_chain_operations, ChainOperations, OpsConfig};
pub use traits::{
    BridgeContract, CardanoWallet, Indexer, ProtocolParams, SecretsManager, SignedBatch,
};
