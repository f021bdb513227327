//! Typed selection failures.

use corridor_primitives::errors::AmountError;
use thiserror::Error;

/// Error from the selection engine.
///
/// The variants are deliberately distinct: an insufficiency means the address
/// simply does not hold enough of some asset, while a count overrun means the
/// funds exist but cannot be gathered within the input budget. Callers react
/// differently to each.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// No candidate UTXOs were supplied at all.
    #[error("no candidate UTXOs to select from")]
    NoInputs,

    /// The candidates' combined holdings cannot cover the desired amount.
    #[error("insufficient funds for asset {asset}: need {needed}, have {available}")]
    InsufficientFunds {
        /// Canonical id of the first uncoverable asset.
        asset: String,
        /// Amount the batch requires.
        needed: u64,
        /// Amount available across all candidates.
        available: u64,
    },

    /// Covering the desired amounts needs more inputs than the budget allows.
    #[error("selection would exceed the maximum input count of {max}")]
    UtxoCountExceeded {
        /// The input-count budget in effect.
        max: usize,
    },

    /// Checked amount arithmetic failed while summing candidates.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Result type alias for selection operations.
pub type SelectionResult<T> = Result<T, SelectionError>;
