//! Adaptive gas-limit window for EVM batch submission.

/// Bounds and step of the gas-limit search window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasLimitConfig {
    /// Lowest gas limit ever attempted.
    pub min: u64,
    /// Highest gas limit ever attempted.
    pub max: u64,
    /// Adjustment applied after each submission attempt.
    pub step: u64,
}

/// Tracks the gas limit across submission attempts.
///
/// The only state in the batcher that survives between iterations. Widens
/// toward `max` after a failed submission and narrows back toward `min` after
/// a success; never reset mid-run. Owned exclusively by one chain's loop, so
/// no synchronization is involved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasLimitHolder {
    min: u64,
    max: u64,
    step: u64,
    current: u64,
}

impl GasLimitHolder {
    /// Creates a holder starting at the window's lower bound.
    pub fn new(config: GasLimitConfig) -> Self {
        debug_assert!(config.min <= config.max, "gas window must be ordered");
        Self {
            min: config.min,
            max: config.max,
            step: config.step,
            current: config.min,
        }
    }

    /// The gas limit to use for the next submission.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Records a successful submission, narrowing the window.
    pub fn on_success(&mut self) {
        self.current = self.current.saturating_sub(self.step).max(self.min);
    }

    /// Records a failed submission, widening the window.
    pub fn on_failure(&mut self) {
        self.current = self.current.saturating_add(self.step).min(self.max);
    }
}
