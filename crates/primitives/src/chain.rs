//! Chain identifiers and chain-family tags.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{buf::Buf32, errors::ParseError};

/// Identifier of a configured chain, as registered in the bridge contract.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Wraps a raw chain id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.0)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The chain family and protocol variant a destination chain speaks.
///
/// Determines which chain-operations strategy the batcher instantiates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainKind {
    /// Cardano-style chain running the reactor (fixed committee) protocol.
    CardanoReactor,
    /// Cardano-style chain running the skyline (multi-asset) protocol.
    CardanoSkyline,
    /// Account-based EVM chain.
    Evm,
}

impl ChainKind {
    /// Whether this kind settles on a UTXO ledger.
    pub fn is_cardano(&self) -> bool {
        matches!(self, Self::CardanoReactor | Self::CardanoSkyline)
    }
}

impl FromStr for ChainKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cardano-reactor" => Ok(Self::CardanoReactor),
            "cardano-skyline" => Ok(Self::CardanoSkyline),
            "evm" => Ok(Self::Evm),
            other => Err(ParseError::UnknownChainKind(other.to_string())),
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CardanoReactor => "cardano-reactor",
            Self::CardanoSkyline => "cardano-skyline",
            Self::Evm => "evm",
        };
        f.write_str(s)
    }
}

/// A chain observation point: block number (or slot) plus block hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPoint {
    /// Block number on EVM chains, absolute slot on Cardano chains.
    pub number: u64,
    /// Hash of the block at that point.
    pub hash: Buf32,
}

impl BlockPoint {
    /// Creates a new point.
    pub fn new(number: u64, hash: Buf32) -> Self {
        Self { number, hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_kind_round_trip() {
        for kind in [
            ChainKind::CardanoReactor,
            ChainKind::CardanoSkyline,
            ChainKind::Evm,
        ] {
            assert_eq!(kind.to_string().parse::<ChainKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_chain_kind_is_an_error() {
        assert!(matches!(
            "solana".parse::<ChainKind>(),
            Err(ParseError::UnknownChainKind(_))
        ));
    }
}
