//! Playlist state
//!
//! Ordered songs plus a current-song pointer. Navigation wraps around both
//! ends; explicit indexes are bounds-checked. Every mutation keeps the
//! pointer on the same song where that song still exists.

use crate::error::{PlaybackError, Result};
use cadence_core::Song;

/// Outcome of removing a song
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub song: Song,
    /// The removed song was the current one
    pub was_current: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistState {
    songs: Vec<Song>,
    current: Option<usize>,
}

impl PlaylistState {
    pub fn new(songs: Vec<Song>) -> Self {
        Self {
            songs,
            current: None,
        }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current.and_then(|index| self.songs.get(index))
    }

    /// Point at `index`
    pub fn set_current(&mut self, index: usize) -> Result<&Song> {
        let len = self.songs.len();
        let song = self
            .songs
            .get(index)
            .ok_or(PlaybackError::IndexOutOfBounds { index, len })?;
        self.current = Some(index);
        Ok(song)
    }

    /// Index after the current one, wrapping to the start
    ///
    /// With no current song the first song is next.
    pub fn next_index(&self) -> Result<usize> {
        let len = self.songs.len();
        if len == 0 {
            return Err(PlaybackError::PlaylistEmpty);
        }
        Ok(self.current.map_or(0, |index| (index + 1) % len))
    }

    /// Index before the current one, wrapping to the end
    pub fn previous_index(&self) -> Result<usize> {
        let len = self.songs.len();
        if len == 0 {
            return Err(PlaybackError::PlaylistEmpty);
        }
        Ok(self
            .current
            .map_or(len - 1, |index| (index + len - 1) % len))
    }

    /// Replace every song; the pointer is cleared
    pub fn replace(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.current = None;
    }

    pub fn append(&mut self, songs: impl IntoIterator<Item = Song>) {
        self.songs.extend(songs);
    }

    /// Remove the song at `index`
    ///
    /// When the current song is removed the pointer stays at the same
    /// position (clamped to the new end) or clears if the list emptied.
    pub fn remove(&mut self, index: usize) -> Result<Removal> {
        let len = self.songs.len();
        if index >= len {
            return Err(PlaybackError::IndexOutOfBounds { index, len });
        }

        let song = self.songs.remove(index);
        let was_current = self.current == Some(index);

        self.current = match self.current {
            Some(current) if current > index => Some(current - 1),
            Some(current) if current == index => {
                if self.songs.is_empty() {
                    None
                } else {
                    Some(current.min(self.songs.len() - 1))
                }
            }
            other => other,
        };

        Ok(Removal { song, was_current })
    }

    /// Move the song at `from` to `to`
    ///
    /// The pointer follows the current song.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.songs.len();
        if from >= len {
            return Err(PlaybackError::IndexOutOfBounds { index: from, len });
        }
        if to >= len {
            return Err(PlaybackError::IndexOutOfBounds { index: to, len });
        }
        if from == to {
            return Ok(());
        }

        let song = self.songs.remove(from);
        self.songs.insert(to, song);

        self.current = self.current.map(|current| {
            if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            }
        });
        Ok(())
    }
}
