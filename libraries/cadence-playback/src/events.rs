//! Playback Events
//!
//! Two vocabularies live here:
//! - `NativeEvent`: what the host media resource raises (play, playing,
//!   timeupdate, ended, error, durationchange)
//! - `PlaybackEvent`: the closed, typed vocabulary an `AudioSession`
//!   publishes, including the derived `layoutTouch` / `layoutEnded` signals
//!
//! `PlayerEvent` is what the orchestrator re-broadcasts process-wide.

use cadence_core::SongKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one `AudioSession`
///
/// Allocated monotonically by the orchestrator; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinds of typed playback events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// Playback request accepted by the resource
    Play,
    /// Audio is actually flowing
    Played,
    /// Native playback fault
    Error,
    /// Natural end of media
    Ended,
    /// Clock tick carrying the current position
    TimeUpdate,
    /// Lookahead: a boundary is `layOut` seconds away
    LayoutTouch,
    /// Exact boundary reached
    LayoutEnded,
    /// Unrecognized kind; never fires
    Unknown,
}

impl EventKind {
    /// Every kind a session can actually emit
    pub const EMITTABLE: [EventKind; 7] = [
        EventKind::Play,
        EventKind::Played,
        EventKind::Error,
        EventKind::Ended,
        EventKind::TimeUpdate,
        EventKind::LayoutTouch,
        EventKind::LayoutEnded,
    ];

    /// Convert to the event name used on the wire
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Played => "played",
            Self::Error => "error",
            Self::Ended => "ended",
            Self::TimeUpdate => "timeupdate",
            Self::LayoutTouch => "layoutTouch",
            Self::LayoutEnded => "layoutEnded",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an event name; anything unrecognized is `Unknown`
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "play" => Self::Play,
            "played" => Self::Played,
            "error" => Self::Error,
            "ended" => Self::Ended,
            "timeupdate" => Self::TimeUpdate,
            "layoutTouch" => Self::LayoutTouch,
            "layoutEnded" => Self::LayoutEnded,
            _ => Self::Unknown,
        }
    }

    /// Whether a subscription to this kind completes after one delivery
    pub fn is_single_shot(&self) -> bool {
        !matches!(self, Self::TimeUpdate)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload carried by some playback events
///
/// Serialized bare (`{ "endTime": 35.0, "currentTime": 33.0 }`); the
/// variant is recovered from the event kind alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum EventData {
    TimeUpdate {
        current_time: f64,
    },
    LayoutTouch {
        /// Peak window end, `None` when the full-track boundary fired
        end_time: Option<f64>,
        current_time: f64,
    },
    LayoutEnded {
        end_time: Option<f64>,
        current_time: f64,
    },
    Error {
        message: String,
    },
}

/// Typed playback event: `{ event, data? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPlaybackEvent")]
pub struct PlaybackEvent {
    pub event: EventKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
}

impl PlaybackEvent {
    pub fn bare(event: EventKind) -> Self {
        Self { event, data: None }
    }

    pub fn with_data(event: EventKind, data: EventData) -> Self {
        Self {
            event,
            data: Some(data),
        }
    }

    /// Position carried by clock-derived events
    pub fn current_time(&self) -> Option<f64> {
        match self.data {
            Some(
                EventData::TimeUpdate { current_time }
                | EventData::LayoutTouch { current_time, .. }
                | EventData::LayoutEnded { current_time, .. },
            ) => Some(current_time),
            _ => None,
        }
    }
}

/// Wire form of a `PlaybackEvent` before the payload is typed
#[derive(Deserialize)]
struct RawPlaybackEvent {
    event: EventKind,
    #[serde(default)]
    data: Option<RawEventData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventData {
    current_time: Option<f64>,
    end_time: Option<f64>,
    message: Option<String>,
}

impl From<RawPlaybackEvent> for PlaybackEvent {
    fn from(raw: RawPlaybackEvent) -> Self {
        let event = raw.event;
        let data = raw.data.and_then(|data| {
            let current_time = data.current_time.unwrap_or_default();
            match event {
                EventKind::TimeUpdate => Some(EventData::TimeUpdate { current_time }),
                EventKind::LayoutTouch => Some(EventData::LayoutTouch {
                    end_time: data.end_time,
                    current_time,
                }),
                EventKind::LayoutEnded => Some(EventData::LayoutEnded {
                    end_time: data.end_time,
                    current_time,
                }),
                EventKind::Error => Some(EventData::Error {
                    message: data.message.unwrap_or_default(),
                }),
                _ => None,
            }
        });
        Self { event, data }
    }
}

/// Events raised by the host media resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NativeEvent {
    /// Play request accepted (`play`)
    Play,
    /// Audio started flowing (`playing`)
    Playing,
    /// Position advanced (`timeupdate`)
    TimeUpdate { current_time: f64 },
    /// Total duration became known or changed (`durationchange`)
    DurationChange { duration: f64 },
    /// Natural end of media (`ended`)
    Ended,
    /// Resource fault (`error`)
    Error { message: String },
}

/// Process-wide streams exposed by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    Play,
    Played,
    SongChange,
    Error,
    Ended,
    LayoutTouch,
    LayoutEnded,
    SongListChange,
    Locate,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::Play,
        Topic::Played,
        Topic::SongChange,
        Topic::Error,
        Topic::Ended,
        Topic::LayoutTouch,
        Topic::LayoutEnded,
        Topic::SongListChange,
        Topic::Locate,
    ];

    /// Topic a session event is re-broadcast on, if any
    pub fn for_kind(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::Play => Some(Self::Play),
            EventKind::Played => Some(Self::Played),
            EventKind::Error => Some(Self::Error),
            EventKind::Ended => Some(Self::Ended),
            EventKind::LayoutTouch => Some(Self::LayoutTouch),
            EventKind::LayoutEnded => Some(Self::LayoutEnded),
            EventKind::TimeUpdate | EventKind::Unknown => None,
        }
    }
}

/// Events re-broadcast by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// A session event for the song it was playing
    Playback {
        session: SessionId,
        song: SongKey,
        event: PlaybackEvent,
    },

    /// `currentSong` moved
    SongChanged {
        index: usize,
        song: SongKey,
        previous: Option<SongKey>,
    },

    /// Playlist mutated; `length` is the post-mutation length
    SongListChanged { length: usize },

    /// UI asked to scroll to the current song
    Located { index: Option<usize> },
}

impl PlayerEvent {
    /// Session the event originated from, for stale-event filtering
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::Playback { session, .. } => Some(*session),
            _ => None,
        }
    }
}
