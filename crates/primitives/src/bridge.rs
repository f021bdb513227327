//! Validator-set primitives.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::buf::Buf32;

/// The index of a validator within the committee.
///
/// A type alias rather than a newtype since the batcher does arithmetic on it
/// while walking the table.
pub type ValidatorIdx = u32;

/// The two verification keys a validator registers with the bridge contract.
///
/// The funds key participates in the multisig holding bridged value; the fee
/// key participates in the separate fee-payer multisig.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct ValidatorKeys {
    /// Verification key for the funds multisig.
    pub funds_key: Buf32,
    /// Verification key for the fee-payer multisig.
    pub fee_key: Buf32,
}

/// The committee as returned by the bridge contract for one chain.
///
/// Keyed by [`ValidatorIdx`] in a `BTreeMap` so every validator derives the
/// same policy script from the same set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorTable(pub BTreeMap<ValidatorIdx, ValidatorKeys>);

impl ValidatorTable {
    /// Number of validators in the committee.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the committee is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signature threshold for this committee size: `2*N/3 + 1`.
    pub fn threshold(&self) -> usize {
        self.0.len() * 2 / 3 + 1
    }

    /// Funds keys in validator-index order.
    pub fn funds_keys(&self) -> Vec<Buf32> {
        self.0.values().map(|keys| keys.funds_key).collect()
    }

    /// Fee keys in validator-index order.
    pub fn fee_keys(&self) -> Vec<Buf32> {
        self.0.values().map(|keys| keys.fee_key).collect()
    }

    /// Finds the index of the validator holding exactly these keys.
    ///
    /// Returns `None` when the keys are not in the committee, which callers
    /// must treat as a fatal configuration error.
    pub fn position_of(&self, keys: &ValidatorKeys) -> Option<ValidatorIdx> {
        self.0
            .iter()
            .find(|(_, entry)| *entry == keys)
            .map(|(idx, _)| *idx)
    }
}

impl FromIterator<(ValidatorIdx, ValidatorKeys)> for ValidatorTable {
    fn from_iter<I: IntoIterator<Item = (ValidatorIdx, ValidatorKeys)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
