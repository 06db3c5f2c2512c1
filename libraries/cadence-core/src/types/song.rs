/// Song types aggregated from third-party providers
use serde::{Deserialize, Serialize};
use std::fmt;

/// Music provider a song was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Kugou Music
    Kugou,
    /// NetEase Cloud Music
    Netease,
    /// Xiami Music
    Xiami,
}

impl Provider {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kugou => "kugou",
            Self::Netease => "netease",
            Self::Xiami => "xiami",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "kugou" => Some(Self::Kugou),
            "netease" => Some(Self::Netease),
            "xiami" => Some(Self::Xiami),
            _ => None,
        }
    }

    /// Logo shown when a song has no album art
    #[must_use]
    pub fn default_image(&self) -> &'static str {
        match self {
            Self::Kugou => "assets/logos/kugou.png",
            Self::Netease => "assets/logos/netease.png",
            Self::Xiami => "assets/logos/xiami.png",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Song identity: a provider-scoped id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongKey {
    /// Provider the id belongs to
    pub provider: Provider,
    /// Provider-assigned song id
    pub id: String,
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// Artist credit on a song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// Display name
    pub name: String,

    /// Provider-assigned artist id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Album a song belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Provider-assigned album id
    pub id: String,
    /// Album title
    pub name: String,

    /// Cover image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

/// A playable song as returned by a provider
///
/// Songs are immutable once fetched. Field names follow the provider JSON
/// (`peakStartTime`, `mvId`) so stored playlists round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Provider-assigned song id
    pub id: String,
    /// Provider the song was fetched from
    pub provider: Provider,
    /// Song title
    pub name: String,

    /// Credited artists, in billing order
    #[serde(default)]
    pub artists: Vec<Artist>,

    /// Album the song was released on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<Album>,

    /// Total duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Start of the preview ("peak") window in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_start_time: Option<f64>,

    /// Music video id, when the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mv_id: Option<String>,
}

impl Song {
    /// Create a song with no artists, album, or timing information
    pub fn new(provider: Provider, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider,
            name: name.into(),
            artists: Vec::new(),
            album: None,
            duration: None,
            peak_start_time: None,
            mv_id: None,
        }
    }

    /// Add an artist credit
    #[must_use]
    pub fn with_artist(mut self, name: impl Into<String>) -> Self {
        self.artists.push(Artist {
            name: name.into(),
            id: None,
        });
        self
    }

    /// Set the total duration in seconds
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Set the preview window start in seconds
    #[must_use]
    pub fn with_peak_start(mut self, seconds: f64) -> Self {
        self.peak_start_time = Some(seconds);
        self
    }

    /// Identity of this song: `(provider, id)`
    pub fn key(&self) -> SongKey {
        SongKey {
            provider: self.provider,
            id: self.id.clone(),
        }
    }

    /// Artist names joined for display
    pub fn format_artists(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// Play-bar view of this song
    pub fn now_playing(&self) -> NowPlaying {
        NowPlaying {
            provider: self.provider,
            name: self.name.clone(),
            artists: self.format_artists(),
            img: self
                .album
                .as_ref()
                .and_then(|album| album.img.clone())
                .unwrap_or_else(|| self.provider.default_image().to_string()),
        }
    }
}

/// What the play bar shows for the current song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// Provider of the song
    pub provider: Provider,
    /// Song title
    pub name: String,
    /// Artist names joined with ` / `
    pub artists: String,
    /// Album art, or the provider logo without one
    pub img: String,
}
