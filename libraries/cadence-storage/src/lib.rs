//! Cadence Storage
//!
//! Playlist persistence behind the `cadence_core::PlaylistStore` trait.
//!
//! Playlists are stored as a JSON array of songs under the key
//! `songs-{mode}` in a simple key-value backend:
//! - `MemoryStore` keeps everything in process (tests, ephemeral sessions)
//! - `FileStore` keeps one `<key>.json` file per key in a directory
//!
//! Reading is forgiving: a stored value that is not a JSON array of songs
//! resets the playlist to empty instead of failing.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{PlaylistStore, Provider, Song};
//! use cadence_storage::{JsonPlaylistStore, MemoryStore};
//!
//! let store = JsonPlaylistStore::new(MemoryStore::new());
//! store.save("1", &[Song::new(Provider::Kugou, "a1", "Intro")]).unwrap();
//!
//! let songs = store.load("1").unwrap();
//! assert_eq!(songs.len(), 1);
//! assert!(store.load("rank").unwrap().is_empty());
//! ```

pub mod error;
pub mod kv;
pub mod playlist;

pub use error::{Result, StorageError};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use playlist::{playlist_key, JsonPlaylistStore};
