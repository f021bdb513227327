//! Slot/block rounding with a no-batch dead zone.
//!
//! Validators poll chain tips at slightly different moments. To agree on a
//! batch's validity window they round the observed slot (or block number) up
//! to the next multiple of a threshold. Observations too close to a rounding
//! boundary are rejected outright, because two validators straddling the
//! boundary would round to different targets. The dead-zone comparison uses
//! integer rational arithmetic only; floating point here would reintroduce
//! the cross-platform divergence the rounding exists to prevent.

use thiserror::Error;

/// Denominator of the dead-zone width: the width is given in basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Error from [`round_with_threshold`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoundingError {
    /// The observed value was zero, which cannot be rounded meaningfully.
    #[error("cannot round zero value")]
    ZeroValue,

    /// The observed value fell inside the dead zone around a boundary.
    ///
    /// Not a failure: callers wait for the next tick.
    #[error("value {value} is within the no-batch period around a multiple of {threshold}")]
    NonActiveBatchPeriod {
        /// The observed slot or block number.
        value: u64,
        /// The rounding threshold in effect.
        threshold: u64,
    },

    /// The rounded target overflowed `u64`.
    #[error("rounding {value} past threshold {threshold} overflowed")]
    Overflow {
        /// The observed slot or block number.
        value: u64,
        /// The rounding threshold in effect.
        threshold: u64,
    },
}

/// Rounds `value` up to the next strict multiple of `threshold`, unless it
/// sits inside the configured dead zone.
///
/// The dead zone spans `threshold * dead_zone_bps / 10_000` on either side of
/// every multiple of `threshold`. With `threshold = 60` and
/// `dead_zone_bps = 1_250` (12.5%), an observation of 75 rounds to 120, 40
/// rounds to 60, and 66 is rejected as [`RoundingError::NonActiveBatchPeriod`]
/// because its remainder 6 lies within 7.5 of the boundary at 60.
pub fn round_with_threshold(
    value: u64,
    threshold: u64,
    dead_zone_bps: u64,
) -> Result<u64, RoundingError> {
    if value == 0 {
        return Err(RoundingError::ZeroValue);
    }
    debug_assert!(threshold > 0, "rounding threshold must be positive");

    let remainder = value % threshold;
    // remainder < threshold * bps / 10_000, kept in integers by
    // cross-multiplying. The same comparison covers both sides of the
    // boundary via the distance to the next multiple.
    let width = (threshold as u128) * (dead_zone_bps as u128);
    let too_low = (remainder as u128) * (BPS_DENOMINATOR as u128) < width;
    let too_high = ((threshold - remainder) as u128) * (BPS_DENOMINATOR as u128) < width;
    if too_low || too_high {
        return Err(RoundingError::NonActiveBatchPeriod { value, threshold });
    }

    (value / threshold)
        .checked_add(1)
        .and_then(|q| q.checked_mul(threshold))
        .ok_or(RoundingError::Overflow { value, threshold })
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: u64 = 60;
    const DEAD_ZONE: u64 = 1_250; // 12.5%

    #[test]
    fn rounds_up_to_next_multiple() {
        assert_eq!(round_with_threshold(75, THRESHOLD, DEAD_ZONE), Ok(120));
        assert_eq!(round_with_threshold(40, THRESHOLD, DEAD_ZONE), Ok(60));
    }

    #[test]
    fn rejects_values_inside_the_dead_zone() {
        // 66 % 60 = 6, within 7.5 of the lower boundary.
        assert_eq!(
            round_with_threshold(66, THRESHOLD, DEAD_ZONE),
            Err(RoundingError::NonActiveBatchPeriod {
                value: 66,
                threshold: THRESHOLD
            })
        );
        // 55 is within 7.5 below the boundary at 60.
        assert!(matches!(
            round_with_threshold(55, THRESHOLD, DEAD_ZONE),
            Err(RoundingError::NonActiveBatchPeriod { .. })
        ));
        // Exact multiples sit on the boundary itself.
        assert!(matches!(
            round_with_threshold(120, THRESHOLD, DEAD_ZONE),
            Err(RoundingError::NonActiveBatchPeriod { .. })
        ));
    }

    #[test]
    fn zero_cannot_be_rounded() {
        assert_eq!(
            round_with_threshold(0, THRESHOLD, DEAD_ZONE),
            Err(RoundingError::ZeroValue)
        );
    }

    #[test]
    fn boundary_of_the_dead_zone_is_exact() {
        // With threshold 80 and 12.5% the half-width is exactly 10; a
        // remainder of exactly 10 is outside the zone (strict comparison).
        assert_eq!(round_with_threshold(90, 80, DEAD_ZONE), Ok(160));
        assert!(matches!(
            round_with_threshold(89, 80, DEAD_ZONE),
            Err(RoundingError::NonActiveBatchPeriod { .. })
        ));
    }

    #[test]
    fn zero_dead_zone_only_rejects_exact_multiples() {
        assert_eq!(round_with_threshold(61, THRESHOLD, 0), Ok(120));
        assert_eq!(round_with_threshold(59, THRESHOLD, 0), Ok(60));
        // Remainder zero is never "strictly inside" a zero-width zone, so an
        // exact multiple still rounds up to the next one.
        assert_eq!(round_with_threshold(60, THRESHOLD, 0), Ok(120));
    }
}
