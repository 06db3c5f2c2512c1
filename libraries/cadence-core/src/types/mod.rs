//! Domain types shared across Cadence

mod peak;
mod player;
mod song;

pub use peak::{PeakConfig, PeakConfigPatch, PeakUpdate};
pub use player::{PlayMode, Status};
pub use song::{Album, Artist, NowPlaying, Provider, Song, SongKey};
