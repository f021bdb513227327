//! Cardano-side encoding: addresses, canonical CBOR and the batch
//! transaction body.

pub mod address;
pub mod cbor;
pub mod tx;

pub use address::CardanoNetwork;
