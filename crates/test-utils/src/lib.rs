//! Test helpers shared across the corridor crates: deterministic generators
//! for keys, committees, UTXOs and confirmed transfers; a capturing tracing
//! subscriber for asserting on warnings; and an in-memory bridge backend that
//! implements the external-interface traits for loop-level tests and local
//! dry runs.

pub mod bridge;
pub mod capture;
pub mod gen;

pub use bridge::{BridgeState, InMemoryBridge};
pub use capture::{capture_logs, CapturedEvent};
