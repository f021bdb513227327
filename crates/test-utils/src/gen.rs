//! Deterministic generators for fixtures.
//!
//! Everything here is seeded: the same tag always yields the same keys,
//! addresses and transactions, so tests asserting on determinism can build
//! their inputs twice and compare bytes.

use corridor_chain_ops::traits::CardanoWallet;
use corridor_primitives::{
    bridge::{ValidatorKeys, ValidatorTable},
    buf::Buf32,
    chain::ChainId,
    tx::{BridgeReceiver, ConfirmedTransaction, TransactionType, Utxo},
};
use corridor_tx_builder::cardano::address::{script_address, CardanoNetwork};
use ed25519_dalek::SigningKey;
use rand::seq::SliceRandom;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

/// A token-free UTXO with a tagged transaction hash.
pub fn utxo(tag: u8, index: u32, amount: u64) -> Utxo {
    Utxo {
        tx_hash: Buf32([tag; 32]),
        output_index: index,
        amount,
        tokens: Vec::new(),
    }
}

/// A UTXO carrying one native token next to its base amount.
pub fn utxo_with_token(
    tag: u8,
    index: u32,
    amount: u64,
    policy: &str,
    name: &str,
    token_amount: u64,
) -> Utxo {
    let mut utxo = utxo(tag, index, amount);
    utxo.tokens = vec![corridor_primitives::asset::TokenAmount::new(
        policy,
        name,
        token_amount,
    )];
    utxo
}

/// A testnet script address derived from a tag byte.
pub fn test_address(tag: u8) -> String {
    script_address(&[tag; 28], CardanoNetwork::Testnet)
}

/// Signing keys seeded from one byte, with the matching verification keys.
pub fn seeded_wallet(seed: u8) -> (CardanoWallet, ValidatorKeys) {
    let funds_skey = Buf32([seed; 32]);
    let fee_skey = Buf32([seed.wrapping_add(128); 32]);
    let funds_signer = SigningKey::from_bytes(funds_skey.as_bytes());
    let fee_signer = SigningKey::from_bytes(fee_skey.as_bytes());

    let wallet = CardanoWallet {
        funds_skey,
        fee_skey,
    };
    let keys = ValidatorKeys {
        funds_key: Buf32(funds_signer.verifying_key().to_bytes()),
        fee_key: Buf32(fee_signer.verifying_key().to_bytes()),
    };
    (wallet, keys)
}

/// A committee containing `own` at index 0 plus `extras` seeded members.
pub fn committee_with(own: ValidatorKeys, extras: u32) -> ValidatorTable {
    std::iter::once((0u32, own))
        .chain((1..=extras).map(|i| (i, seeded_wallet(200 + i as u8).1)))
        .collect()
}

/// A normal confirmed transfer paying one tagged testnet address.
pub fn confirmed_transfer(chain: &str, addr_tag: u8, amount: u64) -> ConfirmedTransaction {
    ConfirmedTransaction {
        source_chain_id: ChainId::from(chain),
        observed_tx_hash: Buf32([addr_tag; 32]),
        nonce: addr_tag as u64,
        tx_type: TransactionType::Normal,
        receivers: vec![BridgeReceiver {
            address: test_address(addr_tag),
            amount,
            wrapped_amount: 0,
            token_id: 0,
        }],
    }
}

/// A normal confirmed transfer paying one EVM address built from a byte.
pub fn confirmed_evm_transfer(chain: &str, addr_byte: u8, amount: u64) -> ConfirmedTransaction {
    ConfirmedTransaction {
        source_chain_id: ChainId::from(chain),
        observed_tx_hash: Buf32([addr_byte; 32]),
        nonce: addr_byte as u64,
        tx_type: TransactionType::Normal,
        receivers: vec![BridgeReceiver {
            address: format!("0x{}", hex::encode([addr_byte; 20])),
            amount,
            wrapped_amount: 0,
            token_id: 0,
        }],
    }
}

/// Shuffles a slice reproducibly from a seed.
///
/// For determinism tests: scramble the input order, run the code under test,
/// and assert the output matches the unscrambled run.
pub fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}
