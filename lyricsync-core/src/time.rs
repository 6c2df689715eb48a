//! Time and duration conversion utilities.
//!
//! The synchronization math runs on signed millisecond counts (elapsed time can
//! be negative before the first line, drift can be negative when a wake fires
//! early), while timestamps and sleeps use [`Duration`]. These helpers convert
//! between the two with explicit saturation instead of `as` casts.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Convert duration to milliseconds as i64, saturating at `i64::MAX`.
    ///
    /// In practice, this is always safe because durations exceeding `i64::MAX`
    /// milliseconds would represent ~292 million years.
    fn as_millis_i64(&self) -> i64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Convert a signed millisecond count into a [`Duration`], clamping negatives to zero.
#[must_use]
pub fn duration_from_millis_i64(millis: i64) -> Duration {
    u64::try_from(millis).map_or(Duration::ZERO, Duration::from_millis)
}
