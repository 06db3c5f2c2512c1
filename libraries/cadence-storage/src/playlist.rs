//! JSON playlist persistence

use crate::error::StorageError;
use crate::kv::KeyValueStore;
use cadence_core::{PlaylistStore, Song};

/// Storage key for the playlist of a mode
pub fn playlist_key(mode: &str) -> String {
    format!("songs-{mode}")
}

/// `PlaylistStore` that keeps each mode's playlist as a JSON array
#[derive(Debug)]
pub struct JsonPlaylistStore<S> {
    backend: S,
}

impl<S: KeyValueStore> JsonPlaylistStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Parse a stored playlist strictly
    ///
    /// `null` is an empty playlist; anything else that is not an array of
    /// songs is `StorageError::Corrupt`.
    fn parse(key: &str, raw: &str) -> Result<Vec<Song>, StorageError> {
        serde_json::from_str::<Option<Vec<Song>>>(raw)
            .map(Option::unwrap_or_default)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })
    }
}

impl<S: KeyValueStore> PlaylistStore for JsonPlaylistStore<S> {
    fn load(&self, mode: &str) -> cadence_core::Result<Vec<Song>> {
        let key = playlist_key(mode);
        let Some(raw) = self.backend.get(&key)? else {
            tracing::debug!(key = %key, "No stored playlist");
            return Ok(Vec::new());
        };

        match Self::parse(&key, &raw) {
            Ok(songs) => {
                tracing::debug!(key = %key, songs = songs.len(), "Loaded playlist");
                Ok(songs)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Stored playlist is corrupt, resetting to empty");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, mode: &str, songs: &[Song]) -> cadence_core::Result<()> {
        let key = playlist_key(mode);
        let raw = serde_json::to_string(songs)?;
        self.backend.set(&key, &raw)?;
        tracing::debug!(key = %key, songs = songs.len(), "Saved playlist");
        Ok(())
    }
}
