//! Per-chain batching loops and their composition.
//!
//! One [`Batcher`] runs one destination chain: on a fixed-interval tick it
//! asks the bridge contract whether a batch is due, pulls the confirmed
//! transfers and validator set, and drives the chain's operations strategy
//! through generate, sign and submit. The [`BatcherManager`] owns one loop
//! per configured chain; loops share nothing, so one chain's failure never
//! touches another.

pub mod batcher;
pub mod config;
pub mod errors;
pub mod manager;

pub use batcher::{Batcher, OpsFactory};
pub use config::{BatcherConfig, ChainConfig};
pub use errors::{BatcherError, BatcherResult};
pub use manager::BatcherManager;
