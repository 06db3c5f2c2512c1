//! Player orchestrator - core command surface
//!
//! Owns the playlist, the current-song pointer, playback status and the one
//! active `AudioSession`. Commands flow in from the UI and the retry
//! coordinator; session events flow out as process-wide broadcasts.
//!
//! The orchestrator never lets a session fault escape as an error to the
//! caller of a command: a song without a playable resource still gets a
//! session, and that session reports the fault on its `error` stream.

use crate::bus::EventStream;
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::events::{EventKind, NativeEvent, PlaybackEvent, PlayerEvent, SessionId, Topic};
use crate::media::MediaBackend;
use crate::playlist::PlaylistState;
use crate::session::AudioSession;
use crate::streams::PlayerStreams;
use cadence_core::{PeakConfig, PeakUpdate, PlayMode, PlaylistStore, Song, SongKey, Status};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Session events the orchestrator re-broadcasts
const WATCHED: [EventKind; 6] = [
    EventKind::Play,
    EventKind::Played,
    EventKind::LayoutTouch,
    EventKind::LayoutEnded,
    EventKind::Ended,
    EventKind::Error,
];

/// Commands accepted from the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    Next,
    Previous,
    PlayAt { index: usize },
    Remove { index: usize },
    MoveItem { from: usize, to: usize },
    SetVolume { volume: f64 },
    Seek { position: f64 },
    Locate,
    SetMode { mode: PlayMode },
    ChangePeak { update: PeakUpdate },
    SetPlaylist { songs: Vec<Song> },
    Append { songs: Vec<Song> },
}

struct ActiveSession {
    session: AudioSession,
    watchers: Vec<EventStream>,
}

pub struct PlayerOrchestrator {
    backend: Box<dyn MediaBackend>,
    playlist: PlaylistState,
    streams: PlayerStreams,

    status: Status,
    mode: PlayMode,
    volume: f64,
    peak_config: PeakConfig,
    advance_after_preview: bool,

    active: Option<ActiveSession>,
    next_session_id: u64,
}

impl PlayerOrchestrator {
    pub fn new(config: &PlayerConfig, backend: Box<dyn MediaBackend>) -> Self {
        Self {
            backend,
            playlist: PlaylistState::default(),
            streams: PlayerStreams::new(config.event_capacity),
            status: Status::Stopped,
            mode: config.mode,
            volume: clamp_volume(config.volume).unwrap_or(1.0),
            peak_config: config.peak,
            advance_after_preview: config.advance_after_preview,
            active: None,
            next_session_id: 1,
        }
    }

    // ===== State =====

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn peak_config(&self) -> &PeakConfig {
        &self.peak_config
    }

    pub fn playlist(&self) -> &PlaylistState {
        &self.playlist
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.playlist.current_song()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playlist.current_index()
    }

    pub fn active_session(&self) -> Option<&AudioSession> {
        self.active.as_ref().map(|active| &active.session)
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active_session().map(AudioSession::id)
    }

    // ===== Streams =====

    /// Subscribe to a process-wide stream
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<PlayerEvent> {
        self.streams.subscribe(topic)
    }

    /// Subscribe directly to the active session
    ///
    /// The stream dies with the session; subscribe again after a song change.
    pub fn subscribe_session(&mut self, kind: EventKind) -> Option<EventStream> {
        self.active
            .as_mut()
            .map(|active| active.session.emit_event(kind))
    }

    // ===== Native events =====

    /// Route a native media event to the session it was raised for
    ///
    /// Events for any session other than the active one are stale and
    /// dropped. Returns whether the event reached a live session.
    pub fn handle_native(&mut self, session: SessionId, event: NativeEvent) -> bool {
        let Some(active) = self.active.as_mut() else {
            tracing::trace!(session = %session, "Native event with no active session");
            return false;
        };
        if active.session.id() != session {
            tracing::trace!(
                session = %session,
                active = %active.session.id(),
                "Dropping native event for stale session"
            );
            return false;
        }

        let delivered = active.session.dispatch(event);
        self.pump();
        delivered
    }

    // ===== Playback Control =====

    /// Resume or start playback of the active session
    ///
    /// No-op without an active session. Status becomes `Playing` only once
    /// the resource accepts the request.
    pub fn play(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!("play: no active session");
            return false;
        };
        if active.session.is_finished() {
            return false;
        }

        // play/played are single-shot per subscription: re-arm the ones that fired
        for kind in [EventKind::Play, EventKind::Played] {
            let armed = active
                .watchers
                .iter()
                .any(|watcher| watcher.kind() == kind && !watcher.is_terminated());
            if !armed {
                active.watchers.push(active.session.emit_event(kind));
            }
        }
        active.session.play();
        self.pump();
        true
    }

    /// Pause the active session; no-op without one
    pub fn pause(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.session.pause();
        if self.status.is_active() {
            self.status = Status::Paused;
        }
        true
    }

    /// Play when paused, pause otherwise
    ///
    /// With nothing loaded, starts the current song (or the first one).
    pub fn toggle_play(&mut self) -> Result<()> {
        if self.active.is_none() || self.status == Status::Failed {
            let index = match self.playlist.current_index() {
                Some(index) => index,
                None => self.playlist.next_index()?,
            };
            return self.play_at(index);
        }

        if self.status == Status::Paused {
            self.play();
        } else {
            self.pause();
        }
        Ok(())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<()> {
        let index = self.playlist.next_index()?;
        let previous = self.current_key();
        self.change_song(index, previous)
    }

    pub fn previous(&mut self) -> Result<()> {
        let index = self.playlist.previous_index()?;
        let previous = self.current_key();
        self.change_song(index, previous)
    }

    /// Jump to `index`; out-of-range indexes are rejected
    pub fn play_at(&mut self, index: usize) -> Result<()> {
        let len = self.playlist.len();
        if index >= len {
            return Err(PlaybackError::IndexOutOfBounds { index, len });
        }
        let previous = self.current_key();
        self.change_song(index, previous)
    }

    /// Replay the current song on a fresh session
    pub fn play_current(&mut self) -> Result<()> {
        let index = self
            .playlist
            .current_index()
            .ok_or(PlaybackError::NoActiveSession)?;
        self.start_session(index)
    }

    /// Pause at the preview boundary
    ///
    /// With `advance_after_preview`, moves on to the next preview.
    pub fn lay_out_pause(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Err(PlaybackError::NoActiveSession);
        };
        active.session.pause();
        self.status = Status::Paused;
        tracing::info!(session = %active.session.id(), song = %active.session.song().key(), "Paused at layout boundary");

        if self.advance_after_preview {
            self.next()?;
        }
        Ok(())
    }

    /// Release the active session and halt
    pub fn stop(&mut self) {
        self.release_active();
        self.status = Status::Stopped;
    }

    /// Halt automatic playback after an unrecoverable failure
    pub fn fail(&mut self) {
        self.release_active();
        self.status = Status::Failed;
        tracing::error!("Playback halted");
    }

    pub fn seek(&mut self, position: f64) -> Result<()> {
        let active = self.active.as_mut().ok_or(PlaybackError::NoActiveSession)?;
        active.session.seek(position);
        Ok(())
    }

    /// Set volume, clamped to `[0, 1]`; non-finite values are ignored
    pub fn set_volume(&mut self, volume: f64) {
        let Some(volume) = clamp_volume(volume) else {
            tracing::warn!(volume, "Ignoring non-finite volume");
            return;
        };
        self.volume = volume;
        if let Some(active) = self.active.as_mut() {
            active.session.set_volume(volume);
        }
    }

    /// Ask the UI to scroll to the current song
    pub fn locate(&self) {
        self.streams.publish(
            Topic::Locate,
            PlayerEvent::Located {
                index: self.playlist.current_index(),
            },
        );
    }

    /// Mode used by sessions created from now on
    pub fn set_mode(&mut self, mode: PlayMode) {
        if self.mode != mode {
            tracing::info!(mode = %mode, "Play mode changed");
        }
        self.mode = mode;
    }

    /// Partial peak update
    ///
    /// The config half is merged into the shared config used by later
    /// sessions; both halves apply to the active session.
    pub fn change_peak(&mut self, update: &PeakUpdate) {
        if let Some(patch) = update.peak_config.as_ref() {
            self.peak_config.merge(patch);
        }
        if let Some(active) = self.active.as_mut() {
            active.session.change_peak(update);
        }
    }

    // ===== Playlist =====

    /// Replace the playlist; the active session is released
    pub fn set_playlist(&mut self, songs: Vec<Song>) {
        self.release_active();
        self.status = Status::Stopped;
        self.playlist.replace(songs);
        self.publish_list_change();
    }

    pub fn append(&mut self, songs: Vec<Song>) {
        self.playlist.append(songs);
        self.publish_list_change();
    }

    /// Remove the song at `index`
    ///
    /// Removing the current song releases its session; if it was playing,
    /// the song that took its place starts.
    pub fn remove(&mut self, index: usize) -> Result<Song> {
        let removal = self.playlist.remove(index)?;
        self.publish_list_change();

        if removal.was_current {
            let was_active = self.status.is_active();
            self.release_active();
            self.status = Status::Stopped;

            if let Some(current) = self.playlist.current_index() {
                if was_active {
                    self.change_song(current, Some(removal.song.key()))?;
                }
            }
        }
        Ok(removal.song)
    }

    /// Drag-reorder
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        self.playlist.move_item(from, to)?;
        self.publish_list_change();
        Ok(())
    }

    /// Load the persisted playlist for `mode`
    ///
    /// Unreadable storage resets the playlist to empty rather than failing.
    /// Returns the number of songs loaded.
    pub fn restore_playlist(&mut self, store: &dyn PlaylistStore, mode: &str) -> usize {
        let songs = match store.load(mode) {
            Ok(songs) => songs,
            Err(e) => {
                let err = PlaybackError::PersistenceCorrupt(e.to_string());
                tracing::warn!(mode, error = %err, "Resetting playlist");
                Vec::new()
            }
        };
        let count = songs.len();
        self.set_playlist(songs);
        tracing::info!(mode, songs = count, "Playlist restored");
        count
    }

    // ===== Commands =====

    /// Apply a UI command
    pub fn execute(&mut self, command: Command) -> Result<()> {
        tracing::debug!(command = ?command, "Command");
        match command {
            Command::Play => {
                self.play();
            }
            Command::Pause => {
                self.pause();
            }
            Command::TogglePlay => self.toggle_play()?,
            Command::Next => self.next()?,
            Command::Previous => self.previous()?,
            Command::PlayAt { index } => self.play_at(index)?,
            Command::Remove { index } => {
                self.remove(index)?;
            }
            Command::MoveItem { from, to } => self.move_item(from, to)?,
            Command::SetVolume { volume } => self.set_volume(volume),
            Command::Seek { position } => self.seek(position)?,
            Command::Locate => self.locate(),
            Command::SetMode { mode } => self.set_mode(mode),
            Command::ChangePeak { update } => self.change_peak(&update),
            Command::SetPlaylist { songs } => self.set_playlist(songs),
            Command::Append { songs } => self.append(songs),
        }
        Ok(())
    }

    // ===== Internal =====

    fn current_key(&self) -> Option<SongKey> {
        self.playlist.current_song().map(Song::key)
    }

    fn change_song(&mut self, index: usize, previous: Option<SongKey>) -> Result<()> {
        let song = self.playlist.set_current(index)?.key();
        tracing::info!(index, song = %song, "Song change");
        self.streams.publish(
            Topic::SongChange,
            PlayerEvent::SongChanged {
                index,
                song,
                previous,
            },
        );
        self.start_session(index)
    }

    /// Release the current session and start a new one for `index`
    fn start_session(&mut self, index: usize) -> Result<()> {
        let len = self.playlist.len();
        let song = self
            .playlist
            .get(index)
            .cloned()
            .ok_or(PlaybackError::IndexOutOfBounds { index, len })?;

        self.release_active();

        let id = SessionId::new(self.next_session_id);
        self.next_session_id += 1;

        let media = match self.backend.open(id, &song) {
            Ok(media) => Some(media),
            Err(e) => {
                tracing::warn!(session = %id, song = %song.key(), error = %e, "No resource for song");
                None
            }
        };

        let peak_start = self.resolve_peak_start(&song);
        let mut session = AudioSession::new(id, song, media, peak_start, self.peak_config);
        session.set_volume(self.volume);
        if let Some(start) = peak_start {
            session.seek(start);
        }

        let watchers = WATCHED
            .iter()
            .map(|kind| session.emit_event(*kind))
            .collect();
        tracing::debug!(session = %id, song = %session.song().key(), peak_start = ?peak_start, "Session created");

        self.status = Status::Loading;
        let active = self.active.insert(ActiveSession { session, watchers });
        active.session.play();
        self.pump();
        Ok(())
    }

    /// Peak start for a new session
    ///
    /// Full mode never uses one. A start at or past the song's end is
    /// rejected and the song plays in full; a window overhanging the end is
    /// kept and capped by the session.
    fn resolve_peak_start(&self, song: &Song) -> Option<f64> {
        if self.mode != PlayMode::Peak {
            return None;
        }
        let start = song.peak_start_time.filter(|s| s.is_finite())?.max(0.0);
        let Some(duration) = song.duration else {
            return Some(start);
        };

        let end_time = self.peak_config.end_time(start);
        if start >= duration {
            let err = PlaybackError::BoundaryMisconfiguration {
                peak_start: start,
                end_time,
                duration,
            };
            tracing::warn!(song = %song.key(), error = %err, "Peak start rejected, playing full song");
            return None;
        }
        if end_time > duration {
            let err = PlaybackError::BoundaryMisconfiguration {
                peak_start: start,
                end_time,
                duration,
            };
            tracing::debug!(song = %song.key(), error = %err, "Peak window capped at song end");
        }
        Some(start)
    }

    fn release_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.session.release();
        }
    }

    /// Drain the active session's watchers and re-broadcast
    fn pump(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let mut events = Vec::new();
        for watcher in &mut active.watchers {
            events.extend(watcher.drain());
        }
        active.watchers.retain(|watcher| !watcher.is_terminated());

        let session = active.session.id();
        let song = active.session.song().key();
        for event in events {
            self.on_session_event(session, &song, event);
        }
    }

    fn on_session_event(&mut self, session: SessionId, song: &SongKey, event: PlaybackEvent) {
        match event.event {
            EventKind::Play => self.status = Status::Playing,
            EventKind::Ended | EventKind::Error => self.status = Status::Stopped,
            _ => {}
        }

        if let Some(topic) = Topic::for_kind(event.event) {
            self.streams.publish(
                topic,
                PlayerEvent::Playback {
                    session,
                    song: song.clone(),
                    event,
                },
            );
        }
    }

    fn publish_list_change(&self) {
        self.streams.publish(
            Topic::SongListChange,
            PlayerEvent::SongListChanged {
                length: self.playlist.len(),
            },
        );
    }
}

fn clamp_volume(volume: f64) -> Option<f64> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}

impl std::fmt::Debug for PlayerOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerOrchestrator")
            .field("status", &self.status)
            .field("mode", &self.mode)
            .field("volume", &self.volume)
            .field("current_index", &self.playlist.current_index())
            .field("playlist_len", &self.playlist.len())
            .field("active_session", &self.active_session_id())
            .finish_non_exhaustive()
    }
}
