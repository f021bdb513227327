//! Errors shared by the primitive types.

use thiserror::Error;

/// Error parsing a primitive type from its raw representation.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// A byte buffer had the wrong length.
    #[error("invalid buffer length: expected {expected}, got {got}")]
    InvalidBufLength {
        /// Expected number of bytes.
        expected: usize,
        /// Number of bytes supplied.
        got: usize,
    },

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A chain kind string did not name a supported chain family.
    #[error("unknown chain kind: {0}")]
    UnknownChainKind(String),
}

/// Arithmetic error while accumulating or subtracting asset amounts.
///
/// All amount arithmetic in the batcher is checked; a wrap-around would
/// silently desynchronize validators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    /// Adding amounts for the asset overflowed `u64`.
    #[error("amount overflow for asset {asset}")]
    Overflow {
        /// Canonical id of the offending asset.
        asset: String,
    },

    /// Subtracting amounts for the asset went below zero.
    #[error("amount underflow for asset {asset}")]
    Underflow {
        /// Canonical id of the offending asset.
        asset: String,
    },
}
