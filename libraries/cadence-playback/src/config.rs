//! Player configuration

use cadence_core::{PeakConfig, PlayMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Two-tier retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Replays of one song before advancing past it (default: 1)
    #[serde(default = "default_max_song_retry")]
    pub max_song_retry: u32,

    /// List-level recoveries allowed per playlist entry (default: 2)
    #[serde(default = "default_max_song_list_retry")]
    pub max_song_list_retry: u32,

    /// Backoff unit; the n-th list-level recovery waits `n * step` (default: 200ms)
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

impl RetryPolicy {
    /// List-level recoveries allowed for a playlist of `playlist_len` songs
    pub fn list_budget(&self, playlist_len: usize) -> u32 {
        let len = u32::try_from(playlist_len).unwrap_or(u32::MAX);
        self.max_song_list_retry.saturating_mul(len)
    }

    /// Delay before the `recovery`-th list-level advance
    pub fn backoff(&self, recovery: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms.saturating_mul(u64::from(recovery)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_song_retry: default_max_song_retry(),
            max_song_list_retry: default_max_song_list_retry(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

/// Configuration for the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Preview window shared by every session unless changed
    #[serde(default)]
    pub peak: PeakConfig,

    /// Initial volume in `[0, 1]` (default: 0.8)
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Full songs or peak previews (default: full)
    #[serde(default)]
    pub mode: PlayMode,

    /// In peak mode, move on to the next preview at the layout boundary
    /// (default: true)
    #[serde(default = "default_true")]
    pub advance_after_preview: bool,

    /// Buffer of each process-wide broadcast stream (default: 64)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Persistence key suffix for the playlist (default: "1")
    #[serde(default = "default_playlist_mode")]
    pub playlist_mode: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            peak: PeakConfig::default(),
            volume: default_volume(),
            mode: PlayMode::default(),
            advance_after_preview: true,
            event_capacity: default_event_capacity(),
            playlist_mode: default_playlist_mode(),
        }
    }
}

fn default_max_song_retry() -> u32 {
    1
}

fn default_max_song_list_retry() -> u32 {
    2
}

fn default_backoff_step_ms() -> u64 {
    200
}

fn default_volume() -> f64 {
    0.8
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    64
}

fn default_playlist_mode() -> String {
    "1".to_string()
}
