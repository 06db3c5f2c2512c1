//! Collaborator traits for Cadence

use crate::error::Result;
use crate::types::Song;

/// Playlist persistence collaborator
///
/// Implementers read and write a whole playlist under a mode-scoped key.
/// The playback engine only ever calls `save` after a playlist mutation and
/// `load` once at startup.
pub trait PlaylistStore {
    /// Load the playlist stored for `mode`
    ///
    /// A missing entry is an empty playlist. Implementations must never
    /// return a partially populated list: stored data that cannot be parsed
    /// is reported as an empty playlist, not as an error.
    ///
    /// # Errors
    /// Returns an error only if the underlying medium cannot be read
    fn load(&self, mode: &str) -> Result<Vec<Song>>;

    /// Replace the playlist stored for `mode`
    ///
    /// # Errors
    /// Returns an error if the playlist cannot be serialized or written
    fn save(&self, mode: &str, songs: &[Song]) -> Result<()>;
}
