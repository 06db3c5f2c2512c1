//! Cadence Core
//!
//! Platform-agnostic types, traits, and error handling shared by the Cadence
//! playback engine and its collaborators.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Song`, `Artist`, `Album`, `Provider`, `PeakConfig`
//! - **Player Types**: `Status`, `PlayMode`
//! - **Collaborator Traits**: `PlaylistStore`
//! - **Error Handling**: Unified `CadenceError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{PeakConfig, Provider, Song};
//!
//! let song = Song::new(Provider::Netease, "29829683", "Chiisana Koi no Uta")
//!     .with_duration(326.0)
//!     .with_peak_start(60.0);
//!
//! let config = PeakConfig::default();
//! assert_eq!(config.end_time(60.0), 60.0 + config.duration + config.after);
//! assert_eq!(song.key().to_string(), "netease:29829683");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CadenceError, Result};
pub use traits::PlaylistStore;
pub use types::{
    Album, Artist, NowPlaying, PeakConfig, PeakConfigPatch, PeakUpdate, PlayMode, Provider, Song,
    SongKey, Status,
};
