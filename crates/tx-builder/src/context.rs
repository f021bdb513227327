//! Build-time configuration shared by the aggregator and the encoders.

use std::collections::BTreeMap;

use corridor_primitives::{asset::AssetId, chain::ChainId};
use serde::{Deserialize, Serialize};

use crate::{
    cardano::address::CardanoNetwork,
    errors::{TxBuilderError, TxBuilderResult},
};

/// The destination-chain token a source chain's wrapped amounts convert into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedToken {
    /// Hex-encoded minting policy id of the token.
    pub policy: String,
    /// Asset name within the policy.
    pub name: String,
}

impl WrappedToken {
    /// The asset id of this token.
    pub fn asset_id(&self) -> AssetId {
        AssetId::token(self.policy.clone(), self.name.clone())
    }
}

/// Per-source-chain wrapped-token exchange table.
///
/// Part of the chain configuration; a source chain with no entry cannot send
/// wrapped amounts to this destination. The reactor protocol configures an
/// empty table, so any wrapped amount arriving there is a build error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenExchange(BTreeMap<ChainId, WrappedToken>);

impl TokenExchange {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the wrapped token for a source chain.
    pub fn insert(&mut self, source: ChainId, token: WrappedToken) {
        self.0.insert(source, token);
    }

    /// Looks up the wrapped token for a source chain.
    pub fn wrapped_token(&self, source: &ChainId) -> TxBuilderResult<&WrappedToken> {
        self.0
            .get(source)
            .ok_or_else(|| TxBuilderError::MissingTokenMapping {
                chain: source.to_string(),
            })
    }

    /// Asset ids of every registered wrapped token, in table order.
    pub fn known_assets(&self) -> Vec<AssetId> {
        self.0.values().map(WrappedToken::asset_id).collect()
    }
}

impl FromIterator<(ChainId, WrappedToken)> for TokenExchange {
    fn from_iter<I: IntoIterator<Item = (ChainId, WrappedToken)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Chain configuration consumed by the output aggregator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorContext {
    /// Network destination addresses must belong to.
    pub network: CardanoNetwork,
    /// Minimum base-asset amount a change output must carry.
    pub min_utxo: u64,
    /// Wrapped-token conversion table keyed by source chain.
    pub exchange: TokenExchange,
}

impl AggregatorContext {
    /// Context for a reactor chain: base asset only, no token table.
    pub fn reactor(network: CardanoNetwork, min_utxo: u64) -> Self {
        Self {
            network,
            min_utxo,
            exchange: TokenExchange::new(),
        }
    }

    /// Context for a skyline chain with the given exchange table.
    pub fn skyline(network: CardanoNetwork, min_utxo: u64, exchange: TokenExchange) -> Self {
        Self {
            network,
            min_utxo,
            exchange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_mapping_is_an_error() {
        let exchange: TokenExchange = [(
            ChainId::from("cardano-prime"),
            WrappedToken {
                policy: "aa".repeat(28),
                name: "wrapped".to_string(),
            },
        )]
        .into_iter()
        .collect();

        assert!(exchange.wrapped_token(&ChainId::from("cardano-prime")).is_ok());
        assert!(matches!(
            exchange.wrapped_token(&ChainId::from("unmapped")),
            Err(TxBuilderError::MissingTokenMapping { .. })
        ));
    }
}
