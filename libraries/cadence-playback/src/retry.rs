//! Retry coordination
//!
//! Two failure budgets guard automatic playback:
//! - per song: a failing song is replayed up to `max_song_retry` times
//! - per list: after that the player advances, at most
//!   `max_song_list_retry * playlist length` times before giving up
//!
//! The n-th list-level advance waits `n * backoff_step`. A song reaching its
//! natural end forgives every earlier failure.
//!
//! The coordinator only reacts to events of the session that is active when
//! it looks; anything older is stale and ignored.

use crate::config::RetryPolicy;
use crate::error::{PlaybackError, Result};
use crate::events::{PlayerEvent, SessionId, Topic};
use crate::orchestrator::PlayerOrchestrator;
use crate::streams::drain;
use cadence_core::{PlayMode, PlaylistStore};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Failure counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Replays of the current song so far
    pub song_retry_count: u32,
    /// List-level recoveries since the last success
    pub list_retry_count: u32,
}

/// What to do about an `error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Play the same song again, immediately
    Replay,
    /// Move to the next song after `delay`
    Advance { recovery: u32, delay: Duration },
    /// Every budget is spent
    Exhausted { recoveries: u32, budget: u32 },
}

impl RetryState {
    /// Apply one `error` to the counters
    pub fn on_error(&mut self, policy: &RetryPolicy, playlist_len: usize) -> RetryDecision {
        let budget = policy.list_budget(playlist_len);
        if self.list_retry_count >= budget {
            return RetryDecision::Exhausted {
                recoveries: self.list_retry_count,
                budget,
            };
        }

        if self.song_retry_count >= policy.max_song_retry {
            self.song_retry_count = 0;
            self.list_retry_count += 1;
            return RetryDecision::Advance {
                recovery: self.list_retry_count,
                delay: policy.backoff(self.list_retry_count),
            };
        }

        self.song_retry_count += 1;
        RetryDecision::Replay
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingAdvance {
    due: Instant,
    session: SessionId,
}

/// Drives replays and advances from the orchestrator's streams
pub struct RetryCoordinator {
    policy: RetryPolicy,
    state: RetryState,
    pending: Option<PendingAdvance>,
    exhausted: bool,

    ended: broadcast::Receiver<PlayerEvent>,
    errors: broadcast::Receiver<PlayerEvent>,
    layout_touch: broadcast::Receiver<PlayerEvent>,
    song_list_change: broadcast::Receiver<PlayerEvent>,

    store: Option<(Box<dyn PlaylistStore>, String)>,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy, orchestrator: &PlayerOrchestrator) -> Self {
        Self {
            policy,
            state: RetryState::default(),
            pending: None,
            exhausted: false,
            ended: orchestrator.subscribe(Topic::Ended),
            errors: orchestrator.subscribe(Topic::Error),
            layout_touch: orchestrator.subscribe(Topic::LayoutTouch),
            song_list_change: orchestrator.subscribe(Topic::SongListChange),
            store: None,
        }
    }

    /// Persist the playlist under `mode` whenever it changes
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn PlaylistStore>, mode: impl Into<String>) -> Self {
        self.store = Some((store, mode.into()));
        self
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Whether the last error was fatal
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// When the pending advance is due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.due)
    }

    /// Forget every failure and any pending advance
    pub fn reset(&mut self) {
        self.state.reset();
        self.pending = None;
        self.exhausted = false;
    }

    /// React to everything the orchestrator broadcast since the last poll
    ///
    /// Keeps going until the streams are quiet, so replays that fail on the
    /// spot are handled in the same call. Fires the pending advance once
    /// `now` reaches it.
    ///
    /// # Errors
    /// Returns `ListExhausted` when an error arrives with every budget
    /// spent; the orchestrator has been halted by then.
    pub fn poll(&mut self, orchestrator: &mut PlayerOrchestrator, now: Instant) -> Result<()> {
        loop {
            let mut progressed = self.persist_changes(orchestrator);

            for event in drain(&mut self.ended, Topic::Ended) {
                if is_current(&event, orchestrator) {
                    progressed = true;
                    self.on_ended(orchestrator);
                }
            }

            for event in drain(&mut self.errors, Topic::Error) {
                if is_current(&event, orchestrator) {
                    progressed = true;
                    self.on_error(orchestrator, now)?;
                }
            }

            for event in drain(&mut self.layout_touch, Topic::LayoutTouch) {
                if is_current(&event, orchestrator) {
                    progressed = true;
                    self.on_layout_touch(orchestrator);
                }
            }

            progressed |= self.fire_due(orchestrator, now);

            if !progressed {
                return Ok(());
            }
        }
    }

    fn on_ended(&mut self, orchestrator: &mut PlayerOrchestrator) {
        self.reset();
        tracing::debug!("Song ended, advancing");
        if let Err(e) = orchestrator.next() {
            tracing::warn!(error = %e, "Could not advance after end");
        }
    }

    fn on_error(&mut self, orchestrator: &mut PlayerOrchestrator, now: Instant) -> Result<()> {
        let decision = self.state.on_error(&self.policy, orchestrator.playlist().len());
        self.pending = None;

        match decision {
            RetryDecision::Replay => {
                tracing::info!(
                    song_retry = self.state.song_retry_count,
                    "Replaying failed song"
                );
                if let Err(e) = orchestrator.play_current() {
                    tracing::warn!(error = %e, "Replay failed");
                }
            }
            RetryDecision::Advance { recovery, delay } => {
                tracing::warn!(
                    recovery,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Song retries exhausted, advancing"
                );
                match orchestrator.active_session_id() {
                    Some(session) => {
                        self.pending = Some(PendingAdvance {
                            due: now + delay,
                            session,
                        });
                    }
                    None => tracing::debug!("No session left to advance from"),
                }
            }
            RetryDecision::Exhausted { recoveries, budget } => {
                self.exhausted = true;
                orchestrator.fail();
                let err = PlaybackError::ListExhausted { recoveries, budget };
                tracing::error!(error = %err, "Giving up on the playlist");
                return Err(err);
            }
        }
        Ok(())
    }

    fn on_layout_touch(&mut self, orchestrator: &mut PlayerOrchestrator) {
        if orchestrator.mode() != PlayMode::Peak {
            return;
        }
        // A preview that reached its boundary counts as a success
        self.reset();
        if let Err(e) = orchestrator.lay_out_pause() {
            tracing::warn!(error = %e, "Could not pause at layout boundary");
        }
    }

    /// Fire the pending advance if it is due
    ///
    /// Dropped when another session became active in the meantime. When the
    /// failed song was removed and nothing is playing, the song that took
    /// its place starts instead.
    fn fire_due(&mut self, orchestrator: &mut PlayerOrchestrator, now: Instant) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if now < pending.due {
            return false;
        }
        self.pending = None;

        let result = match orchestrator.active_session_id() {
            Some(active) if active == pending.session => orchestrator.next(),
            Some(active) => {
                tracing::debug!(session = %pending.session, active = %active, "Dropping advance for stale session");
                return false;
            }
            None => match orchestrator.current_index() {
                Some(index) => {
                    tracing::debug!(session = %pending.session, index, "Failed song left the playlist, starting its replacement");
                    orchestrator.play_at(index)
                }
                None => {
                    tracing::debug!(session = %pending.session, "Nothing left to advance to");
                    return false;
                }
            },
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Could not advance after failure");
        }
        true
    }

    fn persist_changes(&mut self, orchestrator: &PlayerOrchestrator) -> bool {
        if drain(&mut self.song_list_change, Topic::SongListChange).is_empty() {
            return false;
        }
        if let Some((store, mode)) = self.store.as_ref() {
            let songs = orchestrator.playlist().songs();
            match store.save(mode, songs) {
                Ok(()) => tracing::debug!(mode = %mode, songs = songs.len(), "Playlist persisted"),
                Err(e) => tracing::warn!(mode = %mode, error = %e, "Failed to persist playlist"),
            }
        }
        // Saving never causes new events
        false
    }
}

fn is_current(event: &PlayerEvent, orchestrator: &PlayerOrchestrator) -> bool {
    let current = event.session().is_some() && event.session() == orchestrator.active_session_id();
    if !current {
        tracing::trace!(event = ?event, "Ignoring stale event");
    }
    current
}

impl std::fmt::Debug for RetryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryCoordinator")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("exhausted", &self.exhausted)
            .field("persisting", &self.store.is_some())
            .finish()
    }
}
