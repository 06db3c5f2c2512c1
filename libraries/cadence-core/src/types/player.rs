/// Player status and mode types
use serde::{Deserialize, Serialize};

/// Playback status of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No session active
    #[default]
    Stopped,

    /// Session created, playback requested but not yet accepted
    Loading,

    /// The resource accepted the play request
    Playing,

    /// Paused mid-song
    Paused,

    /// Every retry budget was consumed; automatic advancement halted
    Failed,
}

impl Status {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Failed => "failed",
        }
    }

    /// Whether a session is expected to be producing audio
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loading | Self::Playing)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether songs are played in full or as peak previews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Whole songs, start to end
    #[default]
    Full,

    /// Preview windows starting at each song's peak
    Peak,
}

impl PlayMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Peak => "peak",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "peak" => Some(Self::Peak),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
