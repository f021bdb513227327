//! Backoff retry for fallible startup operations.
//!
//! Used for one-shot calls made outside the batching loops, such as loading
//! signing keys from the secrets manager at boot. RPC failures inside a
//! batching loop are handled differently: the client is discarded and the
//! whole attempt repeats on the next tick.

use std::{thread::sleep, time::Duration};

use tracing::{error, warn};

pub mod policies;

/// Default maximum number of retries for startup calls.
pub const DEFAULT_STARTUP_MAX_RETRIES: u16 = 4;

/// Delay policy used by [`retry_with_backoff`].
pub trait Backoff {
    /// Delay before the first retry, in milliseconds.
    fn base_delay_ms(&self) -> u64;

    /// Delay following `curr_delay_ms`, in milliseconds.
    fn next_delay_ms(&self, curr_delay_ms: u64) -> u64;
}

/// Runs a fallible operation with a backoff retry.
///
/// Retries `operation` up to `max_retries` times, sleeping between attempts
/// per the [`Backoff`] policy. Logs a warning on each failure and an error
/// once the retries are exhausted.
pub fn retry_with_backoff<R, E, F>(
    name: &str,
    max_retries: u16,
    backoff: &impl Backoff,
    operation: F,
) -> Result<R, E>
where
    F: FnMut() -> Result<R, E>,
    E: std::fmt::Debug,
{
    retry_with_backoff_inner(name, max_retries, backoff, operation, sleep)
}

/// Inner method that actually does the retry, generic on the sleep function.
fn retry_with_backoff_inner<R, E, F, S>(
    name: &str,
    max_retries: u16,
    backoff: &impl Backoff,
    mut operation: F,
    mut sleep_fn: S,
) -> Result<R, E>
where
    F: FnMut() -> Result<R, E>,
    E: std::fmt::Debug,
    S: FnMut(Duration),
{
    let mut delay = backoff.base_delay_ms();

    for attempt in 0..=max_retries {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                warn!(
                    ?err,
                    attempt = attempt + 1,
                    operation = name,
                    delay_ms = delay,
                    "operation failed, retrying"
                );
                sleep_fn(Duration::from_millis(delay));
                delay = backoff.next_delay_ms(delay);
            }
            Err(err) => {
                error!(operation = name, "max retries exceeded, returning last error");
                return Err(err);
            }
        }
    }

    unreachable!("loop always returns within max_retries + 1 attempts")
}
