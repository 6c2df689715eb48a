//! Two-tier wake timer.
//!
//! Far from the due time the timer takes one coarse sleep that stops short of
//! the deadline by the threshold. Inside the threshold it polls at frame
//! cadence, so the wake lands on the first frame at or after the due time.

use crate::clock::Clock;
use crate::config::PlayerConfig;
use crate::player::PendingWake;
use crate::time::{duration_from_millis_i64, DurationExt};
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// What the timer does next for a given remaining delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStep {
    /// The wake is due
    Fire,
    /// Sleep this long, then check again
    Coarse(Duration),
    /// Sleep one frame, then check again
    Frame,
}

/// Decide the next step for a wake `remaining_ms` away.
#[must_use]
pub fn next_step(remaining_ms: i64, threshold: Duration) -> WakeStep {
    let threshold_ms = threshold.as_millis_i64();
    if remaining_ms <= 0 {
        WakeStep::Fire
    } else if remaining_ms > threshold_ms {
        WakeStep::Coarse(duration_from_millis_i64(remaining_ms - threshold_ms))
    } else {
        WakeStep::Frame
    }
}

/// Waits for [`PendingWake`]s against a [`Clock`].
///
/// Each engine owns its own timer; there is no shared scheduling state.
#[derive(Debug, Clone)]
pub struct WakeTimer<C: Clock> {
    clock: C,
    threshold: Duration,
    frame_interval: Duration,
}

impl<C: Clock> WakeTimer<C> {
    #[must_use]
    pub fn new(clock: C, config: &PlayerConfig) -> Self {
        Self {
            clock,
            threshold: config.wake_threshold(),
            frame_interval: config.frame_interval(),
        }
    }

    /// Sleep until `wake` is due. Returns how many milliseconds late it fired.
    ///
    /// Dropping the future cancels the wait.
    pub async fn wait(&self, wake: PendingWake) -> i64 {
        loop {
            let remaining = wake.remaining_ms(self.clock.now_ms());
            match next_step(remaining, self.threshold) {
                WakeStep::Fire => return remaining.saturating_neg(),
                WakeStep::Coarse(duration) => {
                    trace!("Wake {}: coarse sleep {:?}", wake.generation, duration);
                    sleep(duration).await;
                }
                WakeStep::Frame => sleep(self.frame_interval).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;

    const THRESHOLD: Duration = Duration::from_millis(200);

    #[test]
    fn test_next_step() {
        assert_eq!(next_step(0, THRESHOLD), WakeStep::Fire);
        assert_eq!(next_step(-35, THRESHOLD), WakeStep::Fire);
        assert_eq!(next_step(1, THRESHOLD), WakeStep::Frame);
        assert_eq!(next_step(200, THRESHOLD), WakeStep::Frame);
        assert_eq!(
            next_step(201, THRESHOLD),
            WakeStep::Coarse(Duration::from_millis(1))
        );
        assert_eq!(
            next_step(5000, THRESHOLD),
            WakeStep::Coarse(Duration::from_millis(4800))
        );
    }

    #[test]
    fn test_zero_threshold_sleeps_straight_to_due() {
        assert_eq!(
            next_step(750, Duration::ZERO),
            WakeStep::Coarse(Duration::from_millis(750))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_fires_within_a_frame_of_due() {
        let clock = MonotonicClock::new();
        let timer = WakeTimer::new(clock, &PlayerConfig::default());
        let wake = PendingWake {
            generation: 1,
            due_ms: 1000,
        };

        let late = timer.wait(wake).await;
        let now = clock.now_ms();
        assert!(now >= 1000, "fired early at {now}");
        assert!(now < 1020, "fired late at {now}");
        assert_eq!(late, now - 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_past_due_returns_immediately() {
        let clock = MonotonicClock::new();
        tokio::time::advance(Duration::from_millis(300)).await;
        let timer = WakeTimer::new(clock, &PlayerConfig::default());
        let wake = PendingWake {
            generation: 7,
            due_ms: 100,
        };

        assert_eq!(timer.wait(wake).await, 200);
        assert_eq!(clock.now_ms(), 300);
    }
}
