//! Errors raised while building batch transactions.

use corridor_primitives::errors::AmountError;
use thiserror::Error;

/// Error during aggregation, policy resolution or encoding.
#[derive(Debug, Clone, Error)]
pub enum TxBuilderError {
    /// No wrapped-token mapping is configured for a source chain.
    #[error("no wrapped-token mapping configured for source chain {chain}")]
    MissingTokenMapping {
        /// The offending source chain id.
        chain: String,
    },

    /// This validator's keys are absent from the resolved committee.
    ///
    /// Fatal configuration error: building a script that excludes the local
    /// validator would silently lock it out of signing.
    #[error("own verification keys not present in the validator committee")]
    OwnKeysNotInCommittee,

    /// The committee resolved from the bridge contract was empty.
    #[error("validator committee is empty")]
    EmptyCommittee,

    /// A policy id was not valid hex of the expected length.
    #[error("invalid policy id {policy}")]
    InvalidPolicyId {
        /// The malformed policy id string.
        policy: String,
    },

    /// A destination address could not be decoded for encoding purposes.
    ///
    /// Aggregation drops invalid addresses with a warning; seeing one at
    /// encoding time means a caller bypassed aggregation.
    #[error("undecodable destination address {address}")]
    UndecodableAddress {
        /// The malformed address.
        address: String,
    },

    /// The encoded transaction exceeds the chain's maximum size.
    ///
    /// Fatal for this batch only; a later attempt with fewer aggregated
    /// transfers may fit.
    #[error("encoded transaction is {size} bytes, above the maximum of {max}")]
    TxTooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// Maximum the chain accepts.
        max: usize,
    },

    /// A token's configured decimals exceed the normalization target.
    #[error("token {token_id} has {decimals} decimals, above the fixed-point target of 18")]
    UnsupportedDecimals {
        /// Bridge-registry id of the token.
        token_id: u32,
        /// Configured decimals.
        decimals: u8,
    },

    /// A receiver referenced a token id the registry does not know.
    #[error("no registry entry for token id {token_id}")]
    UnknownToken {
        /// Bridge-registry id of the token.
        token_id: u32,
    },

    /// Checked amount arithmetic failed.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Result type alias for transaction building.
pub type TxBuilderResult<T> = Result<T, TxBuilderError>;
