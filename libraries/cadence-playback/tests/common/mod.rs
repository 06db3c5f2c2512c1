//! Shared test helpers: a recording media backend and song fixtures

#![allow(dead_code)]

use cadence_core::{PlayMode, Provider, Song};
use cadence_playback::{
    MediaBackend, MediaElement, PlaybackError, PlayerConfig, PlayerEvent, PlayerOrchestrator,
    Result, SessionId,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tokio::sync::broadcast;

/// What a media element was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Play,
    Pause,
    Seek(f64),
    Volume(f64),
    Release,
}

#[derive(Debug, Default)]
struct Log {
    opened: Vec<(SessionId, String)>,
    calls: Vec<(SessionId, MediaCall)>,
}

/// Backend that records everything and can be told which songs have no
/// playable resource or reject `play`
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    log: Rc<RefCell<Log>>,
    missing: Rc<RefCell<HashSet<String>>>,
    rejecting: Rc<RefCell<HashSet<String>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `open` fails for this song id
    pub fn set_missing(&self, id: &str) {
        self.missing.borrow_mut().insert(id.to_string());
    }

    /// `play` fails for this song id
    pub fn set_rejecting(&self, id: &str) {
        self.rejecting.borrow_mut().insert(id.to_string());
    }

    /// Song ids in the order sessions were opened for them
    pub fn opened(&self) -> Vec<String> {
        self.log
            .borrow()
            .opened
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn calls(&self, session: SessionId) -> Vec<MediaCall> {
        self.log
            .borrow()
            .calls
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, call)| call.clone())
            .collect()
    }
}

impl MediaBackend for FakeBackend {
    fn open(&mut self, session: SessionId, song: &Song) -> Result<Box<dyn MediaElement>> {
        self.log.borrow_mut().opened.push((session, song.id.clone()));
        if self.missing.borrow().contains(&song.id) {
            return Err(PlaybackError::PlaybackFault(format!(
                "no source for {}",
                song.key()
            )));
        }
        Ok(Box::new(FakeMedia {
            session,
            rejects: self.rejecting.borrow().contains(&song.id),
            log: Rc::clone(&self.log),
        }))
    }
}

struct FakeMedia {
    session: SessionId,
    rejects: bool,
    log: Rc<RefCell<Log>>,
}

impl FakeMedia {
    fn record(&self, call: MediaCall) {
        self.log.borrow_mut().calls.push((self.session, call));
    }
}

impl MediaElement for FakeMedia {
    fn play(&mut self) -> Result<()> {
        self.record(MediaCall::Play);
        if self.rejects {
            return Err(PlaybackError::PlaybackFault("decode error".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.record(MediaCall::Pause);
    }

    fn seek(&mut self, position: f64) {
        self.record(MediaCall::Seek(position));
    }

    fn set_volume(&mut self, volume: f64) {
        self.record(MediaCall::Volume(volume));
    }

    fn release(&mut self) {
        self.record(MediaCall::Release);
    }
}

/// `n` songs `s0..s{n-1}`, 180s long with a peak at 60s
pub fn songs(n: usize) -> Vec<Song> {
    (0..n)
        .map(|i| {
            Song::new(Provider::Netease, format!("s{i}"), format!("Song {i}"))
                .with_artist("Artist")
                .with_duration(180.0)
                .with_peak_start(60.0)
        })
        .collect()
}

pub fn config(mode: PlayMode) -> PlayerConfig {
    PlayerConfig {
        mode,
        ..PlayerConfig::default()
    }
}

/// Orchestrator over `backend` holding `n` songs
pub fn player(config: &PlayerConfig, backend: &FakeBackend, n: usize) -> PlayerOrchestrator {
    let mut player = PlayerOrchestrator::new(config, Box::new(backend.clone()));
    player.set_playlist(songs(n));
    player
}

/// Everything buffered on a broadcast receiver
pub fn received(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Indexes of every `SongChanged` buffered on `rx`
pub fn song_changes(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<usize> {
    received(rx)
        .into_iter()
        .filter_map(|event| match event {
            PlayerEvent::SongChanged { index, .. } => Some(index),
            _ => None,
        })
        .collect()
}
