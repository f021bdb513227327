//! Cardano address validation and encoding.
//!
//! Addresses travel through aggregation as bech32 strings and are decoded to
//! raw bytes only at encoding time. Validation is network-aware: an address
//! for the wrong network is dropped from the batch, not paid.

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};

use crate::errors::{TxBuilderError, TxBuilderResult};

/// Payment address header nibbles we accept as destinations.
///
/// Types 0-3 are key/script base addresses, 6 and 7 are enterprise
/// addresses. Pointer and reward addresses are not valid bridge payouts.
const ACCEPTED_ADDRESS_TYPES: [u8; 6] = [0, 1, 2, 3, 6, 7];

/// Header nibble of a script-payment enterprise address.
const SCRIPT_ENTERPRISE_TYPE: u8 = 7;

/// Length of a base address payload: header + payment part + staking part.
const BASE_ADDRESS_LEN: usize = 57;

/// Length of an enterprise address payload: header + payment part.
const ENTERPRISE_ADDRESS_LEN: usize = 29;

/// The Cardano network a chain configuration targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardanoNetwork {
    /// Production network.
    Mainnet,
    /// Any test network.
    Testnet,
}

impl CardanoNetwork {
    /// The network tag carried in the low nibble of the address header.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Mainnet => 1,
            Self::Testnet => 0,
        }
    }

    /// The bech32 human-readable prefix for this network.
    pub fn hrp(&self) -> Hrp {
        match self {
            Self::Mainnet => Hrp::parse_unchecked("addr"),
            Self::Testnet => Hrp::parse_unchecked("addr_test"),
        }
    }
}

/// Checks that `address` is a payable destination on `network`.
///
/// Returns `false` instead of an error: aggregation treats a bad address as a
/// droppable receiver, not a batch failure.
pub fn validate_address(address: &str, network: CardanoNetwork) -> bool {
    let Ok((hrp, payload)) = bech32::decode(address) else {
        return false;
    };
    if hrp != network.hrp() {
        return false;
    }
    if payload.len() != BASE_ADDRESS_LEN && payload.len() != ENTERPRISE_ADDRESS_LEN {
        return false;
    }

    let header = payload[0];
    let addr_type = header >> 4;
    let net_tag = header & 0x0f;
    ACCEPTED_ADDRESS_TYPES.contains(&addr_type) && net_tag == network.tag()
}

/// Decodes a bech32 address into its raw payload bytes.
pub fn decode_address(address: &str) -> TxBuilderResult<Vec<u8>> {
    bech32::decode(address)
        .map(|(_, payload)| payload)
        .map_err(|_| TxBuilderError::UndecodableAddress {
            address: address.to_string(),
        })
}

/// Encodes a script-payment enterprise address for a multisig script hash.
pub fn script_address(script_hash: &[u8; 28], network: CardanoNetwork) -> String {
    let mut payload = Vec::with_capacity(ENTERPRISE_ADDRESS_LEN);
    payload.push((SCRIPT_ENTERPRISE_TYPE << 4) | network.tag());
    payload.extend_from_slice(script_hash);

    bech32::encode::<Bech32>(network.hrp(), &payload)
        .expect("address payload length is fixed and well below bech32 limits")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_addresses_round_trip() {
        let addr = script_address(&[7u8; 28], CardanoNetwork::Testnet);

        assert!(addr.starts_with("addr_test1"));
        assert!(validate_address(&addr, CardanoNetwork::Testnet));
        assert!(!validate_address(&addr, CardanoNetwork::Mainnet));

        let payload = decode_address(&addr).unwrap();
        assert_eq!(payload.len(), ENTERPRISE_ADDRESS_LEN);
        assert_eq!(payload[0], 0x70);
        assert_eq!(&payload[1..], &[7u8; 28]);
    }

    #[test]
    fn garbage_addresses_fail_validation() {
        assert!(!validate_address("not-an-address", CardanoNetwork::Testnet));
        assert!(!validate_address("", CardanoNetwork::Mainnet));
    }

    #[test]
    fn wrong_network_tag_fails_validation() {
        let mainnet = script_address(&[1u8; 28], CardanoNetwork::Mainnet);
        assert!(!validate_address(&mainnet, CardanoNetwork::Testnet));
    }
}
