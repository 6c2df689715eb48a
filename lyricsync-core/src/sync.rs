use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::player::{LyricEvent, LyricPlayer, PendingWake, PlayerSnapshot};
use crate::timeline::LyricSource;
use crate::wake::WakeTimer;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

const EVENT_CHANNEL_CAPACITY: usize = 64;

enum Command {
    Play { start_ms: i64 },
    Pause,
    SetLyric(LyricSource),
    Snapshot(oneshot::Sender<PlayerSnapshot>),
}

/// Async driver for a [`LyricPlayer`].
///
/// A background task owns the player, applies commands in the order they were
/// sent, sleeps on the player's pending wake and broadcasts every
/// [`LyricEvent`]. The task stops when the cancellation token fires or every
/// handle is dropped.
pub struct LyricSyncEngine {
    command_tx: mpsc::UnboundedSender<Command>,
    event_tx: broadcast::Sender<LyricEvent>,
    cancel_token: CancellationToken,
}

impl LyricSyncEngine {
    /// Spawn the engine task. Must be called within a tokio runtime.
    ///
    /// The player's initial [`LyricEvent::LyricsLoaded`] is held back until the
    /// first command is handled, so every receiver subscribed before that
    /// command gets it.
    #[must_use]
    pub fn start<C>(player: LyricPlayer<C>, cancel_token: Option<CancellationToken>) -> Arc<Self>
    where
        C: Clock + Clone + 'static,
    {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cancel_token = cancel_token.unwrap_or_default();

        let worker = EngineWorker {
            timer: WakeTimer::new(player.clock().clone(), player.config()),
            player,
            command_rx,
            event_tx: event_tx.clone(),
            cancel_token: cancel_token.clone(),
        };
        tokio::spawn(worker.run());

        Arc::new(Self {
            command_tx,
            event_tx,
            cancel_token,
        })
    }

    /// Subscribe to lyric events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LyricEvent> {
        self.event_tx.subscribe()
    }

    /// Start or restart playback at track position `start_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] if the engine task has exited.
    pub fn play(&self, start_ms: i64) -> Result<()> {
        self.send(Command::Play { start_ms })
    }

    /// Pause playback.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] if the engine task has exited.
    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    /// Replace the lyric; playback is paused and the line index reset.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] if the engine task has exited.
    pub fn set_lyric(&self, source: LyricSource) -> Result<()> {
        self.send(Command::SetLyric(source))
    }

    /// Current state of the player, after all previously sent commands.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] if the engine task has exited.
    pub async fn snapshot(&self) -> Result<PlayerSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| CoreError::EngineStopped)
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop the engine task
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| CoreError::EngineStopped)
    }
}

struct EngineWorker<C: Clock> {
    player: LyricPlayer<C>,
    timer: WakeTimer<C>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: broadcast::Sender<LyricEvent>,
    cancel_token: CancellationToken,
}

impl<C: Clock> EngineWorker<C> {
    async fn run(mut self) {
        info!("Lyric sync engine started");

        loop {
            let pending = self.player.pending_wake();

            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    info!("Lyric sync engine shutting down");
                    break;
                }
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        debug!("All engine handles dropped");
                        break;
                    };
                    self.handle(command);
                }
                (wake, late_ms) = wait_for(&self.timer, pending) => {
                    trace!("Wake {} due, {}ms late", wake.generation, late_ms);
                    self.player.fire_wake(wake.generation);
                }
            }

            self.publish();
        }

        self.player.pause();
        self.publish();
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Play { start_ms } => self.player.play(start_ms),
            Command::Pause => self.player.pause(),
            Command::SetLyric(source) => self.player.set_lyric(&source),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.player.snapshot());
            }
        }
    }

    fn publish(&mut self) {
        for event in self.player.drain_events() {
            let _ = self.event_tx.send(event);
        }
    }
}

/// Wait for `wake`, or forever when there is none.
async fn wait_for<C: Clock>(timer: &WakeTimer<C>, wake: Option<PendingWake>) -> (PendingWake, i64) {
    match wake {
        Some(wake) => {
            let late_ms = timer.wait(wake).await;
            (wake, late_ms)
        }
        None => std::future::pending().await,
    }
}
