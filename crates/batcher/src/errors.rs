//! Batcher-level errors.

use corridor_chain_ops::ChainOpsError;
use thiserror::Error;

/// Error terminating a batching loop or failing its construction.
///
/// Everything recoverable is handled inside the loop; an error escaping to
/// the caller means the chain cannot make progress without operator action.
#[derive(Debug, Error)]
pub enum BatcherError {
    /// A fatal chain-operations error stopped the loop.
    #[error(transparent)]
    ChainOps(#[from] ChainOpsError),

    /// The configuration cannot produce a runnable batcher.
    #[error("invalid batcher configuration: {0}")]
    InvalidConfig(String),

    /// A spawned batching loop panicked instead of returning.
    #[error("batcher task panicked: {0}")]
    Panicked(String),
}

/// Result type alias for batcher operations.
pub type BatcherResult<T> = Result<T, BatcherError>;
