//! Deterministic construction of unsigned batch transactions.
//!
//! This crate turns bridge-confirmed transfer requests into the exact bytes
//! every validator must sign: the Cardano multisig transaction (canonical
//! CBOR, Blake2b-256 hashed) or the EVM batch payload (ABI encoded,
//! Keccak-256 hashed under a domain separator). Aggregation, policy-script
//! derivation and encoding all sort by canonical keys before serializing;
//! "sort before serialize" is a standing invariant here, not an optimization.

pub mod aggregator;
pub mod cardano;
pub mod context;
pub mod errors;
pub mod evm;
pub mod policy;

pub use errors::{TxBuilderError, TxBuilderResult};
