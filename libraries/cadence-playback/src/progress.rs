//! Progress window for the UI
//!
//! In peak mode the bar spans the preview window rather than the whole
//! track: `min` is the peak start, `max` the window end capped at the
//! song's duration.

use crate::bus::EventStream;
use crate::events::{EventKind, PlayerEvent, Topic};
use crate::orchestrator::PlayerOrchestrator;
use crate::streams::drain;
use cadence_core::PeakConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Upper bound shown before anything is known about the song
const UNKNOWN_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressWindow {
    pub min: f64,
    pub max: f64,
    pub current: f64,
}

impl Default for ProgressWindow {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: UNKNOWN_MAX,
            current: 0.0,
        }
    }
}

impl ProgressWindow {
    /// Derive the window from a session's timing model
    ///
    /// Without a peak start the whole track is shown, or `0..100` while the
    /// duration is unknown.
    pub fn compute(
        peak_start: Option<f64>,
        config: &PeakConfig,
        duration: Option<f64>,
        current: f64,
    ) -> Self {
        let min = peak_start.unwrap_or(0.0);
        let max = match (peak_start, duration) {
            (Some(start), Some(duration)) => config.end_time(start).min(duration),
            (Some(start), None) => config.end_time(start),
            (None, Some(duration)) => duration,
            (None, None) => UNKNOWN_MAX,
        };
        Self { min, max, current }
    }

    /// Position within the window in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.current - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Keeps the progress window in step with the active session
pub struct ProgressTracker {
    window: ProgressWindow,
    song_change: broadcast::Receiver<PlayerEvent>,
    play: broadcast::Receiver<PlayerEvent>,
    played: broadcast::Receiver<PlayerEvent>,
    ticks: Option<EventStream>,
}

impl ProgressTracker {
    pub fn new(orchestrator: &PlayerOrchestrator) -> Self {
        Self {
            window: ProgressWindow::default(),
            song_change: orchestrator.subscribe(Topic::SongChange),
            play: orchestrator.subscribe(Topic::Play),
            played: orchestrator.subscribe(Topic::Played),
            ticks: None,
        }
    }

    pub fn window(&self) -> ProgressWindow {
        self.window
    }

    /// Catch up with the orchestrator
    ///
    /// Returns the new window when it changed.
    pub fn poll(&mut self, orchestrator: &mut PlayerOrchestrator) -> Option<ProgressWindow> {
        let before = self.window;

        if !drain(&mut self.song_change, Topic::SongChange).is_empty() {
            self.window = ProgressWindow::default();
            self.ticks = None;
        }

        let play = drain(&mut self.play, Topic::Play);
        let played = drain(&mut self.played, Topic::Played);
        if !play.is_empty() || !played.is_empty() {
            self.follow(orchestrator);
        }

        if let Some(ticks) = self.ticks.as_mut() {
            let last = ticks.drain().last().and_then(|tick| tick.current_time());
            if let (Some(current), Some(session)) = (last, orchestrator.active_session()) {
                self.window = ProgressWindow::compute(
                    session.peak_start_time(),
                    session.peak_config(),
                    session.total_duration(),
                    current,
                );
            }
            if ticks.is_terminated() {
                self.ticks = None;
            }
        }

        (self.window != before).then_some(self.window)
    }

    /// Subscribe to the active session's clock unless already following it
    fn follow(&mut self, orchestrator: &mut PlayerOrchestrator) {
        let active = orchestrator.active_session_id();
        let following = self
            .ticks
            .as_ref()
            .filter(|ticks| !ticks.is_terminated())
            .map(EventStream::session);
        if active.is_some() && following != active {
            self.ticks = orchestrator.subscribe_session(EventKind::TimeUpdate);
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("window", &self.window)
            .field("following", &self.ticks.as_ref().map(EventStream::session))
            .finish_non_exhaustive()
    }
}
