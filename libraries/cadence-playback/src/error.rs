//! Error types for playback coordination

use cadence_core::CadenceError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Native resource fault, recoverable through the retry machinery
    #[error("Playback fault: {0}")]
    PlaybackFault(String),

    /// Peak window does not fit inside the song
    #[error("Peak window {peak_start}..{end_time} exceeds song duration {duration}")]
    BoundaryMisconfiguration {
        peak_start: f64,
        end_time: f64,
        duration: f64,
    },

    /// Every retry budget was consumed
    #[error("Song list retry budget exhausted ({recoveries}/{budget} recoveries)")]
    ListExhausted { recoveries: u32, budget: u32 },

    /// Stored playlist could not be read
    #[error("Stored playlist is corrupt: {0}")]
    PersistenceCorrupt(String),

    /// Index out of bounds
    #[error("Index {index} out of bounds for playlist of {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Playlist is empty
    #[error("Playlist is empty")]
    PlaylistEmpty,

    /// No session is active
    #[error("No active session")]
    NoActiveSession,

    /// Collaborator error
    #[error(transparent)]
    Core(#[from] CadenceError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
