//! Audio session - one playback resource for one song
//!
//! Converts the host's native media events into the typed playback
//! vocabulary and derives the preview boundary signals from the clock:
//!
//! ```text
//!        peakStart                    end - layOut    end
//!  0 ────────┼────── duration ───┼── after ──┼──────────┼──────── total
//!                                            │          │
//!                                      layoutTouch  layoutEnded
//! ```
//!
//! where `end = peakStart + duration + after`. Without a peak start only the
//! full-track boundaries (`total - layOut`, `total`) apply.
//!
//! Every stream a session hands out is cancelled by the first of `ended`,
//! `error`, or `release()`. A released session is dead: it ignores native
//! events and cannot be restarted.

use crate::bus::{EventStream, PlaybackEventBus};
use crate::events::{EventData, EventKind, NativeEvent, PlaybackEvent, SessionId};
use crate::media::MediaElement;
use cadence_core::{PeakConfig, PeakUpdate, Song};

/// Message published when the backend had no resource for the song
const NO_RESOURCE: &str = "no playable resource";

pub struct AudioSession {
    id: SessionId,
    song: Song,
    media: Option<Box<dyn MediaElement>>,
    bus: PlaybackEventBus,

    peak_start_time: Option<f64>,
    peak_config: PeakConfig,

    current_time: f64,
    total_duration: Option<f64>,

    layout_touched: bool,
    layout_ended: bool,
    finished: bool,
    released: bool,
}

impl AudioSession {
    /// Create a session for `song`
    ///
    /// Never fails: a missing `media` resource surfaces as an `error` event
    /// on the first `play()`.
    pub fn new(
        id: SessionId,
        song: Song,
        media: Option<Box<dyn MediaElement>>,
        peak_start_time: Option<f64>,
        peak_config: PeakConfig,
    ) -> Self {
        let total_duration = song.duration.filter(|d| d.is_finite() && *d > 0.0);
        Self {
            id,
            song,
            media,
            bus: PlaybackEventBus::new(id),
            peak_start_time,
            peak_config,
            current_time: 0.0,
            total_duration,
            layout_touched: false,
            layout_ended: false,
            finished: false,
            released: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn peak_start_time(&self) -> Option<f64> {
        self.peak_start_time
    }

    pub fn peak_config(&self) -> &PeakConfig {
        &self.peak_config
    }

    /// Last position reported by the resource, in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Resource duration, falling back to the song metadata
    pub fn total_duration(&self) -> Option<f64> {
        self.total_duration
    }

    pub fn has_resource(&self) -> bool {
        self.media.is_some()
    }

    /// Whether `ended` or `error` terminated the session's streams
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// End of the peak window, if a peak start is set
    ///
    /// Capped at the total duration when that is known, so a window that
    /// overhangs the song behaves like the full-track boundary.
    pub fn end_time(&self) -> Option<f64> {
        let start = self.peak_start_time?;
        let end = self.peak_config.end_time(start);
        Some(match self.total_duration {
            Some(total) if end > total => total,
            _ => end,
        })
    }

    /// Subscribe to one kind of playback event
    pub fn emit_event(&mut self, kind: EventKind) -> EventStream {
        self.bus.subscribe(kind)
    }

    /// Subscribe by event name; unrecognized names never fire
    pub fn emit_event_named(&mut self, name: &str) -> EventStream {
        self.emit_event(EventKind::from_name(name))
    }

    /// Apply a partial peak update
    ///
    /// The config is deep-merged; the start time is replaced when given.
    /// The derived boundaries use the new values from the next tick on.
    pub fn change_peak(&mut self, update: &PeakUpdate) {
        if let Some(start) = update.peak_start_time {
            self.peak_start_time = Some(start);
        }
        if let Some(patch) = update.peak_config.as_ref() {
            self.peak_config.merge(patch);
        }
        tracing::debug!(
            session = %self.id,
            peak_start = ?self.peak_start_time,
            peak_config = ?self.peak_config,
            "Peak changed"
        );
    }

    // ===== Commands =====

    /// Request playback from the resource
    pub fn play(&mut self) {
        if self.released || self.finished {
            return;
        }
        let result = match self.media.as_mut() {
            Some(media) => media.play(),
            None => {
                self.fault(NO_RESOURCE.to_string());
                return;
            }
        };
        if let Err(e) = result {
            self.fault(e.to_string());
        }
    }

    pub fn pause(&mut self) {
        if self.released {
            return;
        }
        if let Some(media) = self.media.as_mut() {
            media.pause();
        }
    }

    pub fn seek(&mut self, position: f64) {
        if self.released || !position.is_finite() {
            return;
        }
        if let Some(media) = self.media.as_mut() {
            media.seek(position.max(0.0));
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        if self.released {
            return;
        }
        if let Some(media) = self.media.as_mut() {
            media.set_volume(volume);
        }
    }

    /// Terminate the session
    ///
    /// Idempotent. Cancels every stream and hands the resource back to the
    /// host; native events delivered afterwards are ignored.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.bus.release();
        if let Some(mut media) = self.media.take() {
            media.release();
        }
        tracing::debug!(session = %self.id, song = %self.song.key(), "Session released");
    }

    // ===== Native events =====

    /// Convert a native event into typed events
    ///
    /// Returns `false` when the event was ignored because the session was
    /// already released or finished.
    pub fn dispatch(&mut self, native: NativeEvent) -> bool {
        if self.released || self.finished {
            tracing::trace!(session = %self.id, event = ?native, "Ignoring native event on dead session");
            return false;
        }

        match native {
            NativeEvent::Play => {
                tracing::debug!(session = %self.id, "Event: play");
                self.bus.publish(&PlaybackEvent::bare(EventKind::Play));
            }
            NativeEvent::Playing => {
                tracing::debug!(session = %self.id, "Event: played");
                self.bus.publish(&PlaybackEvent::bare(EventKind::Played));
            }
            NativeEvent::TimeUpdate { current_time } => self.on_time_update(current_time),
            NativeEvent::DurationChange { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    self.total_duration = Some(duration);
                }
            }
            NativeEvent::Ended => {
                tracing::debug!(session = %self.id, "Event: ended");
                self.bus.publish(&PlaybackEvent::bare(EventKind::Ended));
                self.finish();
            }
            NativeEvent::Error { message } => self.fault(message),
        }
        true
    }

    fn on_time_update(&mut self, current_time: f64) {
        self.current_time = current_time;
        self.bus.publish(&PlaybackEvent::with_data(
            EventKind::TimeUpdate,
            EventData::TimeUpdate { current_time },
        ));

        let end_time = self.end_time();
        // A negative lookahead would let the touch fire after the exact boundary
        let lay_out = self.peak_config.lay_out.max(0.0);

        if !self.layout_touched && self.crosses(current_time, lay_out) {
            self.layout_touched = true;
            tracing::debug!(session = %self.id, current_time, end_time = ?end_time, "Event: layoutTouch");
            self.bus.publish(&PlaybackEvent::with_data(
                EventKind::LayoutTouch,
                EventData::LayoutTouch {
                    end_time,
                    current_time,
                },
            ));
        }

        if !self.layout_ended && self.crosses(current_time, 0.0) {
            self.layout_ended = true;
            tracing::debug!(session = %self.id, current_time, end_time = ?end_time, "Event: layoutEnded");
            self.bus.publish(&PlaybackEvent::with_data(
                EventKind::LayoutEnded,
                EventData::LayoutEnded {
                    end_time,
                    current_time,
                },
            ));
        }
    }

    /// Whether `current_time` is within `lookahead` of the peak end or the
    /// track end
    fn crosses(&self, current_time: f64, lookahead: f64) -> bool {
        let near_peak_end = self
            .end_time()
            .is_some_and(|end| current_time >= end - lookahead);
        let near_track_end = self
            .total_duration
            .is_some_and(|total| current_time >= total - lookahead);
        near_peak_end || near_track_end
    }

    fn fault(&mut self, message: String) {
        tracing::debug!(session = %self.id, message = %message, "Event: error");
        self.bus.publish(&PlaybackEvent::with_data(
            EventKind::Error,
            EventData::Error { message },
        ));
        self.finish();
    }

    fn finish(&mut self) {
        self.finished = true;
        self.bus.complete();
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for AudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSession")
            .field("id", &self.id)
            .field("song", &self.song.key())
            .field("peak_start_time", &self.peak_start_time)
            .field("peak_config", &self.peak_config)
            .field("current_time", &self.current_time)
            .field("finished", &self.finished)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{PeakConfigPatch, Provider};

    fn session(peak_start: Option<f64>, duration: Option<f64>) -> AudioSession {
        let mut song = Song::new(Provider::Kugou, "s1", "Song");
        song.duration = duration;
        AudioSession::new(
            SessionId::new(1),
            song,
            None,
            peak_start,
            PeakConfig {
                duration: 20.0,
                after: 5.0,
                lay_out: 2.0,
            },
        )
    }

    fn fire_at(session: &mut AudioSession, kind: EventKind, times: &[f64]) -> Vec<f64> {
        let mut stream = session.emit_event(kind);
        for &t in times {
            session.dispatch(NativeEvent::TimeUpdate { current_time: t });
        }
        stream
            .drain()
            .iter()
            .filter_map(PlaybackEvent::current_time)
            .collect()
    }

    #[test]
    fn peak_window_boundaries() {
        let times: Vec<f64> = (0..=40).map(f64::from).collect();

        let mut s = session(Some(10.0), Some(100.0));
        assert_eq!(s.end_time(), Some(35.0));
        assert_eq!(fire_at(&mut s, EventKind::LayoutTouch, &times), vec![33.0]);

        let mut s = session(Some(10.0), Some(100.0));
        assert_eq!(fire_at(&mut s, EventKind::LayoutEnded, &times), vec![35.0]);
    }

    #[test]
    fn full_track_boundaries_without_peak() {
        let times = [90.0, 97.5, 98.0, 99.0, 100.0, 101.0];
        let mut s = session(None, Some(100.0));
        assert_eq!(fire_at(&mut s, EventKind::LayoutTouch, &times), vec![98.0]);

        let mut s = session(None, Some(100.0));
        assert_eq!(fire_at(&mut s, EventKind::LayoutEnded, &times), vec![100.0]);
    }

    #[test]
    fn unknown_duration_without_peak_never_touches() {
        let mut s = session(None, None);
        assert!(fire_at(&mut s, EventKind::LayoutTouch, &[1.0, 1_000.0, 10_000.0]).is_empty());
    }

    #[test]
    fn overhanging_window_is_capped_at_duration() {
        let mut s = session(Some(90.0), Some(100.0));
        assert_eq!(s.end_time(), Some(100.0));
        assert_eq!(fire_at(&mut s, EventKind::LayoutEnded, &[99.0, 100.0]), vec![100.0]);
    }

    #[test]
    fn duration_change_overrides_metadata() {
        let mut s = session(None, Some(300.0));
        s.dispatch(NativeEvent::DurationChange { duration: 50.0 });
        assert_eq!(s.total_duration(), Some(50.0));
        s.dispatch(NativeEvent::DurationChange { duration: f64::NAN });
        assert_eq!(s.total_duration(), Some(50.0));
    }

    #[test]
    fn change_peak_merges_config() {
        let mut s = session(None, Some(100.0));
        s.change_peak(&PeakUpdate {
            peak_start_time: Some(40.0),
            peak_config: Some(PeakConfigPatch {
                after: Some(0.0),
                ..PeakConfigPatch::default()
            }),
        });
        assert_eq!(s.peak_start_time(), Some(40.0));
        assert_eq!(s.peak_config().duration, 20.0);
        assert_eq!(s.end_time(), Some(60.0));

        s.change_peak(&PeakUpdate::default());
        assert_eq!(s.peak_start_time(), Some(40.0));
    }

    #[test]
    fn missing_resource_reports_error_on_play() {
        let mut s = session(None, Some(100.0));
        let mut errors = s.emit_event(EventKind::Error);
        let mut ticks = s.emit_event(EventKind::TimeUpdate);

        s.play();

        let error = errors.try_next().unwrap();
        assert_eq!(
            error.data,
            Some(EventData::Error {
                message: NO_RESOURCE.to_string()
            })
        );
        assert!(s.is_finished());
        assert!(ticks.try_next().is_none());
        assert!(ticks.is_terminated());
    }

    #[test]
    fn ended_terminates_every_stream() {
        let mut s = session(None, Some(100.0));
        let mut ticks = s.emit_event(EventKind::TimeUpdate);
        let mut ended = s.emit_event(EventKind::Ended);

        s.dispatch(NativeEvent::TimeUpdate { current_time: 1.0 });
        s.dispatch(NativeEvent::Ended);
        assert!(!s.dispatch(NativeEvent::TimeUpdate { current_time: 2.0 }));

        assert_eq!(ticks.drain().len(), 1);
        assert!(ticks.is_terminated());
        assert_eq!(ended.drain(), vec![PlaybackEvent::bare(EventKind::Ended)]);
    }

    #[test]
    fn release_is_idempotent_and_final() {
        let mut s = session(None, Some(100.0));
        let mut play = s.emit_event(EventKind::Play);

        s.release();
        s.release();

        assert!(!s.dispatch(NativeEvent::Play));
        assert!(play.try_next().is_none());
        assert!(s.emit_event(EventKind::Play).is_terminated());
    }
}
