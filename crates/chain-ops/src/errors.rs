//! Error kinds for chain operations, classified the way the batching loop
//! reacts to them.

use corridor_primitives::{errors::AmountError, rounding::RoundingError};
use corridor_selection::SelectionError;
use corridor_tx_builder::TxBuilderError;
use thiserror::Error;

/// A transient failure talking to a chain node, indexer or the bridge
/// contract.
///
/// The loop discards the client and retries on the next tick; nothing about
/// the batch attempt is preserved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("rpc failure: {0}")]
pub struct RpcError(pub String);

impl RpcError {
    /// Wraps an underlying client error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error from a chain-operations strategy.
#[derive(Debug, Error)]
pub enum ChainOpsError {
    /// Transient RPC/network failure; retried next tick with a fresh client.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The observed slot/block fell inside the no-batch dead zone.
    ///
    /// Expected and frequent; callers wait for the next tick.
    #[error("observed value {value} is within the no-batch period of threshold {threshold}")]
    NonActiveBatchPeriod {
        /// The observed slot or block number.
        value: u64,
        /// The rounding threshold in effect.
        threshold: u64,
    },

    /// The chain tip reads as zero; the node has nothing indexed yet.
    #[error("chain tip is zero, node not synchronized")]
    ZeroChainTip,

    /// Aggregation filtered every receiver out; nothing to batch this tick.
    #[error("no payable outputs after aggregation")]
    EmptyBatch,

    /// The selection engine could not fund the batch.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// The encoded transaction exceeds the chain's maximum size.
    ///
    /// Fatal for this batch only; a later attempt batching fewer transfers
    /// may fit.
    #[error("encoded transaction is {size} bytes, above the maximum of {max}")]
    TxTooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// Maximum the chain accepts.
        max: usize,
    },

    /// Transaction building failed for a non-fatal reason.
    #[error("transaction build failed: {0}")]
    Builder(TxBuilderError),

    /// Checked amount arithmetic failed.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// Misconfiguration that cannot heal by waiting; the loop must stop.
    #[error("fatal configuration error: {0}")]
    FatalConfiguration(String),
}

impl ChainOpsError {
    /// Whether this is an expected idle condition rather than a failure.
    pub fn is_wait(&self) -> bool {
        matches!(
            self,
            Self::NonActiveBatchPeriod { .. } | Self::ZeroChainTip | Self::EmptyBatch
        )
    }

    /// Whether the loop should discard its clients before the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    /// Whether the loop must stop instead of spinning on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalConfiguration(_))
    }
}

impl From<RoundingError> for ChainOpsError {
    fn from(err: RoundingError) -> Self {
        match err {
            RoundingError::ZeroValue => Self::ZeroChainTip,
            RoundingError::NonActiveBatchPeriod { value, threshold } => {
                Self::NonActiveBatchPeriod { value, threshold }
            }
            RoundingError::Overflow { value, threshold } => Self::FatalConfiguration(format!(
                "slot rounding overflowed at {value} with threshold {threshold}"
            )),
        }
    }
}

impl From<TxBuilderError> for ChainOpsError {
    fn from(err: TxBuilderError) -> Self {
        match err {
            TxBuilderError::OwnKeysNotInCommittee => Self::FatalConfiguration(
                "own verification keys are not in the validator committee".to_string(),
            ),
            TxBuilderError::EmptyCommittee => {
                Self::FatalConfiguration("validator committee is empty".to_string())
            }
            TxBuilderError::TxTooLarge { size, max } => Self::TxTooLarge { size, max },
            other => Self::Builder(other),
        }
    }
}

/// Result type alias for chain operations.
pub type ChainOpsResult<T> = Result<T, ChainOpsError>;
