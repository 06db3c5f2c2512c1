//! Platform media resource traits
//!
//! Abstracts the host's playback resource (an audio element, a native
//! player) so the coordination engine stays platform-agnostic. The host
//! reports what the resource does through `NativeEvent`s tagged with the
//! session id it was opened for.

use crate::error::Result;
use crate::events::SessionId;
use cadence_core::Song;

/// One playback resource, owned by exactly one `AudioSession`
pub trait MediaElement {
    /// Request playback
    ///
    /// `Ok` only means the request was handed to the resource; acceptance is
    /// reported later through a native `play` event.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Move the playback position, in seconds
    fn seek(&mut self, position: f64);

    /// Set output volume in `[0, 1]`
    fn set_volume(&mut self, volume: f64);

    /// Give the resource back to the host
    ///
    /// Called exactly once, when the owning session is released.
    fn release(&mut self) {}
}

/// Factory for media resources
pub trait MediaBackend {
    /// Open a resource for `song`, reporting native events as `session`
    ///
    /// # Errors
    /// Returns an error when no playable resource exists for the song. The
    /// orchestrator routes this through the session's `error` event.
    fn open(&mut self, session: SessionId, song: &Song) -> Result<Box<dyn MediaElement>>;
}
