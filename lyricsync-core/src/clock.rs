//! Time sources and the playback clock model.
//!
//! Elapsed playback time is derived as
//! `now - origin + start_position`, where `origin` is captured when playback
//! starts and shifted by the combined tag and configured offsets. Resuming at an
//! arbitrary position or applying a lead/lag offset never rewrites line times.

use crate::time::DurationExt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Monotonic time source in milliseconds with an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Clock backed by tokio's monotonic [`Instant`].
///
/// Under a paused tokio runtime (`start_paused`, `time::advance`) this clock
/// follows the virtual time, which keeps wake timing tests deterministic.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> i64 {
        self.epoch.elapsed().as_millis_i64()
    }
}

/// Caller-driven clock. Clones share the same time, so a test or an external
/// transport can hold one handle and move time while the player holds another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Anchor for converting clock time into elapsed playback time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackClock {
    origin_ms: i64,
    start_position_ms: i64,
}

impl PlaybackClock {
    /// Anchor playback at `now_ms`.
    ///
    /// A positive `offset_ms` makes every line trigger that many milliseconds
    /// earlier; `start_position_ms` is the track position playback resumes from.
    #[must_use]
    pub const fn start(now_ms: i64, offset_ms: i64, start_position_ms: i64) -> Self {
        Self {
            origin_ms: now_ms.saturating_sub(offset_ms),
            start_position_ms,
        }
    }

    /// Elapsed playback time at `now_ms`.
    #[must_use]
    pub const fn elapsed_ms(&self, now_ms: i64) -> i64 {
        now_ms
            .saturating_sub(self.origin_ms)
            .saturating_add(self.start_position_ms)
    }
}
