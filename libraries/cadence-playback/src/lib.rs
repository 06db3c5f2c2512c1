//! Cadence - Playback Coordination
//!
//! Turns a host media resource's raw events into a typed playback
//! vocabulary, detects preview ("peak") boundaries, and recovers from
//! playback failures with a two-tier retry budget.
//!
//! This crate provides:
//! - `AudioSession`: one resource for one song, with per-kind event streams
//! - `PlayerOrchestrator`: playlist, status and the single active session
//! - `RetryCoordinator`: replay / advance / give-up decisions
//! - `ProgressTracker`: the progress window shown by the UI
//! - `PlayerRuntime`: a tokio event loop tying them together
//!
//! # Architecture
//!
//! ```text
//! host ──NativeEvent──► AudioSession ──► PlayerOrchestrator ──broadcast──► RetryCoordinator
//!                                              ▲                     └──► ProgressTracker
//!                                              └──────── commands ◄──────────┘
//! ```
//!
//! Platform-specific playback is provided through the `MediaBackend` and
//! `MediaElement` traits; the engine never touches audio itself.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{Provider, Song};
//! use cadence_playback::{
//!     MediaBackend, MediaElement, NativeEvent, PlayerConfig, PlayerOrchestrator, Result,
//!     SessionId, Status,
//! };
//!
//! struct Silent;
//!
//! impl MediaElement for Silent {
//!     fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) {}
//!     fn seek(&mut self, _position: f64) {}
//!     fn set_volume(&mut self, _volume: f64) {}
//! }
//!
//! struct Backend;
//!
//! impl MediaBackend for Backend {
//!     fn open(&mut self, _session: SessionId, _song: &Song) -> Result<Box<dyn MediaElement>> {
//!         Ok(Box::new(Silent))
//!     }
//! }
//!
//! let mut player = PlayerOrchestrator::new(&PlayerConfig::default(), Box::new(Backend));
//! player.set_playlist(vec![Song::new(Provider::Xiami, "1", "Intro")]);
//! player.play_at(0)?;
//! assert_eq!(player.status(), Status::Loading);
//!
//! let session = player.active_session_id().unwrap();
//! player.handle_native(session, NativeEvent::Play);
//! assert_eq!(player.status(), Status::Playing);
//! # Ok::<(), cadence_playback::PlaybackError>(())
//! ```

#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod orchestrator;
pub mod playlist;
pub mod progress;
pub mod retry;
pub mod runtime;
pub mod session;
pub mod streams;

pub use bus::{EventStream, PlaybackEventBus};
pub use config::{PlayerConfig, RetryPolicy};
pub use error::{PlaybackError, Result};
pub use events::{EventData, EventKind, NativeEvent, PlaybackEvent, PlayerEvent, SessionId, Topic};
pub use media::{MediaBackend, MediaElement};
pub use orchestrator::{Command, PlayerOrchestrator};
pub use playlist::{PlaylistState, Removal};
pub use progress::{ProgressTracker, ProgressWindow};
pub use retry::{RetryCoordinator, RetryDecision, RetryState};
pub use runtime::{host_channel, HostMessage, PlayerRuntime};
pub use session::AudioSession;
pub use streams::PlayerStreams;

// Re-export the status type the orchestrator reports
pub use cadence_core::Status;
