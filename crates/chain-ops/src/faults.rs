//! Scripted fault injection for test harnesses.
//!
//! A harness that wants to exercise the "validity window rejected" path
//! across several batch attempts constructs a [`FaultPlan`], passes it into
//! the operations constructor, and owns it for the duration of the test. The
//! plan is explicit injected state, never a process-global, so parallel tests
//! cannot observe each other's scripts.

use std::sync::atomic::{AtomicU32, Ordering};

/// Scripted failures consumed by the chain-operations strategies.
#[derive(Debug, Default)]
pub struct FaultPlan {
    ttl_failures: AtomicU32,
}

impl FaultPlan {
    /// A plan whose next `count` batch generations fail their TTL resolution.
    pub fn with_ttl_failures(count: u32) -> Self {
        Self {
            ttl_failures: AtomicU32::new(count),
        }
    }

    /// Consumes one scripted TTL failure, if any remain.
    pub(crate) fn take_ttl_failure(&self) -> bool {
        self.ttl_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}
