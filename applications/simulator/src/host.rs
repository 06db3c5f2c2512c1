//! Simulated media host
//!
//! Stands in for an audio element: resources report `play`, `playing`,
//! `timeupdate`, `ended` and `error` back to the runtime as `HostMessage`s
//! tagged with the session they were opened for. Only one resource is
//! loaded at a time, like a single `<audio>` element.

use crate::config::SimulationSettings;
use cadence_core::Song;
use cadence_playback::{
    HostMessage, MediaBackend, MediaElement, NativeEvent, PlaybackError, Result, SessionId,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Length assumed for songs without duration metadata
const DEFAULT_DURATION: f64 = 180.0;

#[derive(Debug)]
struct Track {
    session: SessionId,
    duration: f64,
    position: f64,
    playing: bool,
    fault_at: Option<f64>,
}

/// The single loaded resource plus the line back to the runtime
#[derive(Debug, Clone)]
pub struct Deck {
    track: Rc<RefCell<Option<Track>>>,
    tx: mpsc::UnboundedSender<HostMessage>,
}

impl Deck {
    pub fn new(tx: mpsc::UnboundedSender<HostMessage>) -> Self {
        Self {
            track: Rc::new(RefCell::new(None)),
            tx,
        }
    }

    fn emit(&self, session: SessionId, event: NativeEvent) {
        if self.tx.send(HostMessage::Native { session, event }).is_err() {
            tracing::trace!(session = %session, "Runtime gone, dropping native event");
        }
    }

    fn load(&self, track: Track) {
        let (session, duration) = (track.session, track.duration);
        *self.track.borrow_mut() = Some(track);
        self.emit(session, NativeEvent::DurationChange { duration });
    }

    /// Run `f` on the loaded track if it belongs to `session`
    fn with_track<R>(&self, session: SessionId, f: impl FnOnce(&mut Track) -> R) -> Option<R> {
        let mut track = self.track.borrow_mut();
        track.as_mut().filter(|t| t.session == session).map(f)
    }

    fn eject(&self, session: SessionId) {
        let mut track = self.track.borrow_mut();
        if track.as_ref().is_some_and(|t| t.session == session) {
            *track = None;
        }
    }

    /// Advance the loaded track by `step` simulated seconds
    pub fn advance(&self, step: f64) {
        let mut events = Vec::new();
        let session = {
            let mut slot = self.track.borrow_mut();
            let Some(track) = slot.as_mut().filter(|t| t.playing) else {
                return;
            };

            track.position = (track.position + step).min(track.duration);
            events.push(NativeEvent::TimeUpdate {
                current_time: track.position,
            });

            if track.fault_at.is_some_and(|at| track.position >= at) {
                track.playing = false;
                events.push(NativeEvent::Error {
                    message: "simulated decode error".to_string(),
                });
            } else if track.position >= track.duration {
                track.playing = false;
                events.push(NativeEvent::Ended);
            }
            track.session
        };

        for event in events {
            self.emit(session, event);
        }
    }

    /// Tick until `shutdown`
    pub async fn run(&self, tick: Duration, step: f64, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(tick);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => self.advance(step),
            }
        }
    }
}

/// `MediaBackend` over the simulated deck
#[derive(Debug)]
pub struct SimBackend {
    deck: Deck,
    broken: HashSet<String>,
    faulty: HashSet<String>,
    fault_at: f64,
}

impl SimBackend {
    pub fn new(deck: Deck, settings: &SimulationSettings) -> Self {
        Self {
            deck,
            broken: settings.broken.iter().cloned().collect(),
            faulty: settings.faulty.iter().cloned().collect(),
            fault_at: settings.fault_at,
        }
    }
}

impl MediaBackend for SimBackend {
    fn open(&mut self, session: SessionId, song: &Song) -> Result<Box<dyn MediaElement>> {
        if self.broken.contains(&song.id) {
            return Err(PlaybackError::PlaybackFault(format!(
                "no source for {}",
                song.key()
            )));
        }

        self.deck.load(Track {
            session,
            duration: song.duration.unwrap_or(DEFAULT_DURATION),
            position: 0.0,
            playing: false,
            fault_at: self.faulty.contains(&song.id).then_some(self.fault_at),
        });
        tracing::debug!(session = %session, song = %song.key(), "Resource loaded");

        Ok(Box::new(SimMedia {
            session,
            deck: self.deck.clone(),
        }))
    }
}

struct SimMedia {
    session: SessionId,
    deck: Deck,
}

impl MediaElement for SimMedia {
    fn play(&mut self) -> Result<()> {
        let started = self.deck.with_track(self.session, |track| {
            track.playing = true;
        });
        if started.is_none() {
            return Err(PlaybackError::PlaybackFault(
                "resource was unloaded".to_string(),
            ));
        }
        self.deck.emit(self.session, NativeEvent::Play);
        self.deck.emit(self.session, NativeEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        self.deck.with_track(self.session, |track| track.playing = false);
    }

    fn seek(&mut self, position: f64) {
        self.deck.with_track(self.session, |track| {
            track.position = position.clamp(0.0, track.duration);
        });
    }

    fn set_volume(&mut self, volume: f64) {
        tracing::trace!(session = %self.session, volume, "Volume");
    }

    fn release(&mut self) {
        self.deck.eject(self.session);
    }
}
