//! Multisig policy-script and address derivation for the validator committee.
//!
//! Both multisigs (funds and fee-payer) are Cardano native `atLeast` scripts
//! over the committee's verification-key hashes, with the threshold fixed at
//! `2*N/3 + 1`. Key hashes appear in validator-index order; the committee
//! table is ordered, so every validator derives the same script bytes.

use blake2::{
    digest::{consts::U28, Digest},
    Blake2b,
};
use corridor_primitives::{
    bridge::{ValidatorKeys, ValidatorTable},
    buf::Buf32,
};

use crate::{
    cardano::{
        address::{script_address, CardanoNetwork},
        cbor::Encoder,
    },
    errors::{TxBuilderError, TxBuilderResult},
};

type Blake2b224 = Blake2b<U28>;

/// Tag prepended to a native script's CBOR before hashing it.
const NATIVE_SCRIPT_HASH_TAG: u8 = 0x00;

/// One derived multisig: the script, its hash and its payment address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigPolicy {
    /// Canonical CBOR encoding of the native script.
    pub script: Vec<u8>,
    /// Blake2b-224 hash of the tagged script encoding.
    pub script_hash: [u8; 28],
    /// Enterprise script address on the configured network.
    pub address: String,
}

/// The two multisigs a batch spends from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPolicies {
    /// Multisig holding the bridged funds.
    pub funds: MultisigPolicy,
    /// Separate multisig paying transaction fees.
    pub fee: MultisigPolicy,
}

/// Derives the funds and fee multisig policies for `validators`.
///
/// Fails with [`TxBuilderError::OwnKeysNotInCommittee`] when `own_keys` is not
/// part of the table: a script derived without the local validator would
/// silently lock it out of signing, so building must stop instead.
pub fn resolve_policies(
    validators: &ValidatorTable,
    own_keys: &ValidatorKeys,
    network: CardanoNetwork,
) -> TxBuilderResult<BatchPolicies> {
    if validators.is_empty() {
        return Err(TxBuilderError::EmptyCommittee);
    }
    if validators.position_of(own_keys).is_none() {
        return Err(TxBuilderError::OwnKeysNotInCommittee);
    }

    let threshold = validators.threshold() as u64;
    Ok(BatchPolicies {
        funds: derive_policy(&validators.funds_keys(), threshold, network),
        fee: derive_policy(&validators.fee_keys(), threshold, network),
    })
}

/// Builds one `atLeast(threshold, keys)` policy from verification keys.
fn derive_policy(keys: &[Buf32], threshold: u64, network: CardanoNetwork) -> MultisigPolicy {
    let key_hashes: Vec<[u8; 28]> = keys.iter().map(key_hash).collect();
    let script = at_least_script(threshold, &key_hashes);
    let script_hash = native_script_hash(&script);
    let address = script_address(&script_hash, network);
    MultisigPolicy {
        script,
        script_hash,
        address,
    }
}

/// Blake2b-224 hash of a verification key, as used inside scripts.
pub fn key_hash(key: &Buf32) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    hasher.update(key.as_bytes());
    let mut out = [0u8; 28];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Canonical CBOR for `atLeast(threshold, [sig hash...])`.
///
/// Native-script CDDL: `script_n_of_k = (3, n : uint, [* native_script])`,
/// `script_pubkey = (0, addr_keyhash)`.
fn at_least_script(threshold: u64, key_hashes: &[[u8; 28]]) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.array(3).uint(3).uint(threshold);
    enc.array(key_hashes.len() as u64);
    for hash in key_hashes {
        enc.array(2).uint(0).bytes(hash);
    }
    enc.into_bytes()
}

/// Script hash: Blake2b-224 over the tag byte plus the script CBOR.
fn native_script_hash(script: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    hasher.update([NATIVE_SCRIPT_HASH_TAG]);
    hasher.update(script);
    let mut out = [0u8; 28];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(tag: u8) -> ValidatorKeys {
        ValidatorKeys {
            funds_key: Buf32([tag; 32]),
            fee_key: Buf32([tag.wrapping_add(100); 32]),
        }
    }

    fn table(n: u32) -> ValidatorTable {
        (0..n).map(|i| (i, keys(i as u8))).collect()
    }

    #[test]
    fn policies_are_deterministic_and_distinct_per_multisig() {
        let validators = table(4);
        let own = keys(1);

        let first = resolve_policies(&validators, &own, CardanoNetwork::Testnet).unwrap();
        let second = resolve_policies(&validators, &own, CardanoNetwork::Testnet).unwrap();

        assert_eq!(first, second);
        assert_ne!(first.funds.script_hash, first.fee.script_hash);
        assert_ne!(first.funds.address, first.fee.address);
    }

    #[test]
    fn absent_own_keys_is_fatal() {
        let validators = table(4);

        assert!(matches!(
            resolve_policies(&validators, &keys(9), CardanoNetwork::Testnet),
            Err(TxBuilderError::OwnKeysNotInCommittee)
        ));
    }

    #[test]
    fn empty_committee_is_rejected() {
        let validators: ValidatorTable = std::iter::empty().collect();

        assert!(matches!(
            resolve_policies(&validators, &keys(0), CardanoNetwork::Testnet),
            Err(TxBuilderError::EmptyCommittee)
        ));
    }

    #[test]
    fn committee_change_changes_the_script() {
        let own = keys(0);

        let four = resolve_policies(&table(4), &own, CardanoNetwork::Testnet).unwrap();
        let five = resolve_policies(&table(5), &own, CardanoNetwork::Testnet).unwrap();

        assert_ne!(four.funds.address, five.funds.address);
    }

    #[test]
    fn script_encodes_the_threshold() {
        let validators = table(6);
        let policies =
            resolve_policies(&validators, &keys(2), CardanoNetwork::Mainnet).unwrap();

        // [3, 5, [...]] with six committee members: 2*6/3 + 1 = 5.
        assert_eq!(&policies.funds.script[..3], &[0x83, 0x03, 0x05]);
    }
}
