//! Asset identifiers and per-asset sum accounting.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::errors::AmountError;

/// Canonical rendering of the base asset inside logs and error messages.
pub const BASE_ASSET_ID: &str = "base";

/// Identifies an asset held in a UTXO or owed to an output.
///
/// The derived ordering puts the base asset before every token and orders
/// tokens by `(policy, name)`, which matches the canonical `"policy.name"`
/// string order. Encoders rely on this ordering; do not reorder variants.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetId {
    /// The chain's base asset (lovelace on Cardano, the native coin on EVM).
    Base,
    /// A native token issued under a minting policy.
    Token {
        /// Hex-encoded minting policy id.
        policy: String,
        /// Asset name within the policy.
        name: String,
    },
}

impl AssetId {
    /// Builds a token asset id from its policy and name.
    pub fn token(policy: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Token {
            policy: policy.into(),
            name: name.into(),
        }
    }

    /// Returns `true` for the base asset.
    pub fn is_base(&self) -> bool {
        matches!(self, Self::Base)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str(BASE_ASSET_ID),
            Self::Token { policy, name } => write!(f, "{policy}.{name}"),
        }
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({self})")
    }
}

/// A quantity of one native token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Hex-encoded minting policy id.
    pub policy: String,
    /// Asset name within the policy.
    pub name: String,
    /// Token quantity.
    pub amount: u64,
}

impl TokenAmount {
    /// Creates a new token amount.
    pub fn new(policy: impl Into<String>, name: impl Into<String>, amount: u64) -> Self {
        Self {
            policy: policy.into(),
            name: name.into(),
            amount,
        }
    }

    /// The asset id this amount counts.
    pub fn asset_id(&self) -> AssetId {
        AssetId::token(self.policy.clone(), self.name.clone())
    }

    /// Canonical `"policy.name"` key, used to sort tokens inside outputs.
    pub fn token_name(&self) -> String {
        format!("{}.{}", self.policy, self.name)
    }
}

/// Per-asset sums: the common currency of aggregation and coin selection.
///
/// Desired amounts, UTXO totals and expected change are all `SumMap`s. Values
/// are exact unsigned integers; a zero entry is normalized away so that two
/// maps describing the same quantities compare equal. Iteration order is the
/// [`AssetId`] order, so serializing a `SumMap` is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumMap(BTreeMap<AssetId, u64>);

impl SumMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero asset entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no asset has a non-zero amount.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Amount recorded for the asset; absent entries read as zero.
    pub fn get(&self, asset: &AssetId) -> u64 {
        self.0.get(asset).copied().unwrap_or(0)
    }

    /// Adds `amount` to the asset's entry with overflow checking.
    ///
    /// Adding zero is a no-op and does not materialize an entry.
    pub fn add(&mut self, asset: AssetId, amount: u64) -> Result<(), AmountError> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.0.entry(asset.clone()).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| AmountError::Overflow {
                asset: asset.to_string(),
            })?;
        Ok(())
    }

    /// Merges every entry of `other` into `self`.
    pub fn merge(&mut self, other: &SumMap) -> Result<(), AmountError> {
        for (asset, amount) in other.iter() {
            self.add(asset.clone(), *amount)?;
        }
        Ok(())
    }

    /// Returns `true` if `self` holds at least `desired`'s amount for every
    /// asset in `desired`.
    pub fn covers(&self, desired: &SumMap) -> bool {
        desired
            .iter()
            .all(|(asset, amount)| self.get(asset) >= *amount)
    }

    /// Subtracts `other` from `self`, erroring on any per-asset underflow.
    ///
    /// Entries that reach zero are dropped so the result stays normalized.
    pub fn checked_sub(&self, other: &SumMap) -> Result<SumMap, AmountError> {
        let mut out = self.0.clone();
        for (asset, amount) in other.iter() {
            let have = out.get(asset).copied().unwrap_or(0);
            let left = have
                .checked_sub(*amount)
                .ok_or_else(|| AmountError::Underflow {
                    asset: asset.to_string(),
                })?;
            if left == 0 {
                out.remove(asset);
            } else {
                out.insert(asset.clone(), left);
            }
        }
        Ok(SumMap(out))
    }

    /// Per-asset deficits of `self` against `desired` (only positive ones).
    pub fn shortfall(&self, desired: &SumMap) -> SumMap {
        let mut out = BTreeMap::new();
        for (asset, amount) in desired.iter() {
            let have = self.get(asset);
            if *amount > have {
                out.insert(asset.clone(), amount - have);
            }
        }
        SumMap(out)
    }

    /// Iterates entries in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &u64)> {
        self.0.iter()
    }
}

impl FromIterator<(AssetId, u64)> for SumMap {
    fn from_iter<I: IntoIterator<Item = (AssetId, u64)>>(iter: I) -> Self {
        let mut map = SumMap::new();
        for (asset, amount) in iter {
            // Construction from literals; overflow here means the caller's
            // literals were already inconsistent.
            map.add(asset, amount).expect("sum map literal overflow");
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_sorts_before_tokens() {
        let mut map = SumMap::new();
        map.add(AssetId::token("aa", "tok"), 5).unwrap();
        map.add(AssetId::Base, 10).unwrap();

        let keys: Vec<_> = map.iter().map(|(a, _)| a.clone()).collect();
        assert_eq!(keys[0], AssetId::Base);
    }

    #[test]
    fn zero_entries_are_absent() {
        let mut map = SumMap::new();
        map.add(AssetId::Base, 0).unwrap();
        assert!(map.is_empty());

        map.add(AssetId::Base, 4).unwrap();
        let drained = map.checked_sub(&map.clone()).unwrap();
        assert!(drained.is_empty());
    }

    #[test]
    fn covers_requires_every_asset() {
        let have: SumMap = [(AssetId::Base, 100u64)].into_iter().collect();
        let want: SumMap = [
            (AssetId::Base, 50u64),
            (AssetId::token("p", "gold"), 1u64),
        ]
        .into_iter()
        .collect();

        assert!(!have.covers(&want));
        assert_eq!(have.shortfall(&want).get(&AssetId::token("p", "gold")), 1);
    }

    #[test]
    fn checked_sub_underflow_is_an_error() {
        let have: SumMap = [(AssetId::Base, 10u64)].into_iter().collect();
        let want: SumMap = [(AssetId::Base, 11u64)].into_iter().collect();

        assert!(matches!(
            have.checked_sub(&want),
            Err(AmountError::Underflow { .. })
        ));
    }
}
