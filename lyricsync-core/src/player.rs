//! Drift-correcting lyric line scheduler.
//!
//! [`LyricPlayer`] is a synchronous state machine. It never sleeps and never
//! calls foreign code: a wake is requested by storing a [`PendingWake`], and
//! line changes are queued as [`LyricEvent`]s for the owner to drain. Whoever
//! owns the player (the async [`LyricSyncEngine`](crate::LyricSyncEngine), a
//! render loop, a test) waits until the wake is due and calls
//! [`LyricPlayer::fire_wake`].

use crate::clock::{Clock, PlaybackClock};
use crate::config::PlayerConfig;
use crate::tags::LyricTags;
use crate::timeline::{LyricLine, LyricSource, Timeline};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Events produced by the player, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricEvent {
    /// A lyric was parsed (on construction and on every `set_lyric`)
    LyricsLoaded {
        timeline: Arc<Timeline>,
        tags: LyricTags,
    },
    /// The current line changed
    LineChanged { index: usize, line: LyricLine },
    /// The last line became current and playback stopped
    PlaybackEnded,
}

/// A requested future invocation of the refresh step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWake {
    /// Identifies this request; superseded requests are ignored when fired
    pub generation: u64,
    /// Clock time (ms) at which the wake is due
    pub due_ms: i64,
}

impl PendingWake {
    /// Milliseconds until the wake is due; zero or negative once due.
    #[must_use]
    pub const fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.due_ms.saturating_sub(now_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
}

/// Point-in-time view of a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub current_line_index: usize,
    pub elapsed_ms: i64,
    pub timeline: Arc<Timeline>,
    pub tags: LyricTags,
}

impl PlayerSnapshot {
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    #[must_use]
    pub fn current_line(&self) -> Option<&LyricLine> {
        self.timeline.get(self.current_line_index)
    }
}

/// Synchronizes a lyric timeline against a clock.
pub struct LyricPlayer<C: Clock> {
    clock: C,
    config: PlayerConfig,
    timeline: Arc<Timeline>,
    tags: LyricTags,
    status: PlaybackStatus,
    current_line_index: usize,
    playback_clock: PlaybackClock,
    pending_wake: Option<PendingWake>,
    last_generation: u64,
    outbox: VecDeque<LyricEvent>,
}

impl<C: Clock> LyricPlayer<C> {
    /// Create a player and parse `source`. A [`LyricEvent::LyricsLoaded`] is
    /// queued for the initial timeline.
    #[must_use]
    pub fn new(source: LyricSource, config: PlayerConfig, clock: C) -> Self {
        let mut player = Self {
            clock,
            config,
            timeline: Arc::new(Timeline::default()),
            tags: LyricTags::default(),
            status: PlaybackStatus::Stopped,
            current_line_index: 0,
            playback_clock: PlaybackClock::default(),
            pending_wake: None,
            last_generation: 0,
            outbox: VecDeque::new(),
        };
        player.load(&source);
        player
    }

    /// Start or restart synchronized playback at track position `start_ms`.
    ///
    /// No-op on an empty timeline. Any pending wake is cancelled first.
    pub fn play(&mut self, start_ms: i64) {
        if self.timeline.is_empty() {
            debug!("Ignoring play on empty timeline");
            return;
        }

        self.cancel_wake();
        self.status = PlaybackStatus::Playing;

        let offset_ms = self.tags.offset.saturating_add(self.config.offset_ms);
        self.playback_clock = PlaybackClock::start(self.clock.now_ms(), offset_ms, start_ms);

        let elapsed = self.elapsed_ms();
        let index = self.timeline.locate(elapsed, 0);
        info!(
            "Playing from {}ms (offset {}ms, elapsed {}ms, line {})",
            start_ms, offset_ms, elapsed, index
        );

        self.refresh(index);
    }

    /// Stop playback, cancelling the pending wake.
    ///
    /// If the clock has moved past the reported line since the last wake, the
    /// current line is corrected and a line change is emitted. Calling this
    /// while stopped does nothing.
    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }

        self.status = PlaybackStatus::Stopped;
        self.cancel_wake();

        if self.current_line_index == self.timeline.max_line_index() {
            return;
        }

        let elapsed = self.elapsed_ms();
        let index = self.timeline.locate(elapsed, 0);
        info!("Paused at {}ms (line {})", elapsed, index);

        if index != self.current_line_index {
            self.current_line_index = index;
            self.emit_line_changed(index);
        }
    }

    /// Replace the lyric. Pauses first, then rebuilds tags and timeline and
    /// resets the current line to 0.
    pub fn set_lyric(&mut self, source: &LyricSource) {
        self.pause();
        self.load(source);
    }

    /// Run the refresh step for a previously requested wake.
    ///
    /// Returns `false` and does nothing if the wake was superseded or playback
    /// has stopped since it was requested.
    pub fn fire_wake(&mut self, generation: u64) -> bool {
        let wake = match self.pending_wake {
            Some(wake)
                if wake.generation == generation && self.status == PlaybackStatus::Playing =>
            {
                wake
            }
            _ => {
                trace!("Ignoring stale wake {}", generation);
                return false;
            }
        };

        self.pending_wake = None;
        trace!(
            "Wake {} fired {}ms late",
            wake.generation,
            wake.remaining_ms(self.clock.now_ms()).saturating_neg()
        );
        self.refresh(self.current_line_index + 1);
        true
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<LyricEvent> {
        self.outbox.drain(..).collect()
    }

    #[must_use]
    pub const fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    #[must_use]
    pub const fn tags(&self) -> &LyricTags {
        &self.tags
    }

    #[must_use]
    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    #[must_use]
    pub const fn current_line_index(&self) -> usize {
        self.current_line_index
    }

    #[must_use]
    pub fn current_line(&self) -> Option<&LyricLine> {
        self.timeline.get(self.current_line_index)
    }

    #[must_use]
    pub const fn status(&self) -> PlaybackStatus {
        self.status
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    #[must_use]
    pub const fn pending_wake(&self) -> Option<PendingWake> {
        self.pending_wake
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Elapsed playback time according to the clock anchored by the last `play`.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.playback_clock.elapsed_ms(self.clock.now_ms())
    }

    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            status: self.status,
            current_line_index: self.current_line_index,
            elapsed_ms: self.elapsed_ms(),
            timeline: Arc::clone(&self.timeline),
            tags: self.tags.clone(),
        }
    }

    fn load(&mut self, source: &LyricSource) {
        self.tags = LyricTags::parse(&source.lyric);
        self.timeline = Arc::new(Timeline::from_source(source, self.config.remove_blank_lines));
        self.current_line_index = 0;

        info!(
            "Loaded lyric: {} lines, {} extended bodies, tag offset {}ms",
            self.timeline.len(),
            source.extended.len(),
            self.tags.offset
        );

        self.outbox.push_back(LyricEvent::LyricsLoaded {
            timeline: Arc::clone(&self.timeline),
            tags: self.tags.clone(),
        });
    }

    /// Make `index` current if the clock agrees, otherwise move toward the line
    /// the clock says is active, then arm the wake for the following line.
    ///
    /// Catch-up only moves forward and correction only moves backward, so the
    /// candidate settles within `len + 1` passes. Only the settled line is
    /// reported.
    fn refresh(&mut self, mut index: usize) {
        let timeline = Arc::clone(&self.timeline);
        let lines = timeline.lines();
        let max_index = timeline.max_line_index();

        for _ in 0..=lines.len() {
            if index >= max_index {
                self.finish(max_index);
                return;
            }

            let line = &lines[index];
            let elapsed = self.elapsed_ms();
            let drift = elapsed.saturating_sub(line.time_ms());

            if drift >= 0 || index == 0 {
                let delay = lines[index + 1]
                    .time_ms()
                    .saturating_sub(line.time_ms())
                    .saturating_sub(drift);
                if delay > 0 {
                    self.settle(index, delay);
                    return;
                }

                // Already late for the next line too
                let located = timeline.locate(elapsed, index + 1).max(index + 1);
                debug!(
                    "Catching up from line {} to {} (drift {}ms)",
                    index, located, drift
                );
                index = located;
                continue;
            }

            // The clock is behind this line's start
            let located = timeline.locate(elapsed, index);
            debug!(
                "Correcting from line {} to {} (drift {}ms)",
                index, located, drift
            );
            index = located;
        }

        warn!("Refresh did not settle, falling back to a full locate");
        let elapsed = self.elapsed_ms();
        let index = timeline.locate(elapsed, 0);
        if index >= max_index {
            self.finish(max_index);
        } else {
            let delay = lines[index + 1].time_ms().saturating_sub(elapsed).max(1);
            self.settle(index, delay);
        }
    }

    fn settle(&mut self, index: usize, delay_ms: i64) {
        self.current_line_index = index;
        self.arm_wake(delay_ms);
        self.emit_line_changed(index);
    }

    fn finish(&mut self, max_index: usize) {
        self.current_line_index = max_index;
        self.cancel_wake();
        self.status = PlaybackStatus::Stopped;
        self.emit_line_changed(max_index);
        info!("Reached last line {}, playback ended", max_index);
        self.outbox.push_back(LyricEvent::PlaybackEnded);
    }

    fn arm_wake(&mut self, delay_ms: i64) {
        self.cancel_wake();
        self.last_generation += 1;
        let wake = PendingWake {
            generation: self.last_generation,
            due_ms: self.clock.now_ms().saturating_add(delay_ms),
        };
        debug!("Armed wake {} in {}ms", wake.generation, delay_ms);
        self.pending_wake = Some(wake);
    }

    fn cancel_wake(&mut self) {
        if let Some(wake) = self.pending_wake.take() {
            trace!("Cancelled wake {}", wake.generation);
        }
    }

    fn emit_line_changed(&mut self, index: usize) {
        if let Some(line) = self.timeline.get(index) {
            self.outbox.push_back(LyricEvent::LineChanged {
                index,
                line: line.clone(),
            });
        }
    }
}
