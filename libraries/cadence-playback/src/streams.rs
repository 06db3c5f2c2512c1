//! Process-wide player streams
//!
//! One broadcast channel per `Topic`. Downstream components (retry
//! coordination, progress, UI) subscribe independently; publishing with no
//! subscriber is not an error.

use crate::events::{PlayerEvent, Topic};
use tokio::sync::broadcast::{self, error::TryRecvError};

#[derive(Debug, Clone)]
pub struct PlayerStreams {
    play: broadcast::Sender<PlayerEvent>,
    played: broadcast::Sender<PlayerEvent>,
    song_change: broadcast::Sender<PlayerEvent>,
    error: broadcast::Sender<PlayerEvent>,
    ended: broadcast::Sender<PlayerEvent>,
    layout_touch: broadcast::Sender<PlayerEvent>,
    layout_ended: broadcast::Sender<PlayerEvent>,
    song_list_change: broadcast::Sender<PlayerEvent>,
    locate: broadcast::Sender<PlayerEvent>,
}

impl PlayerStreams {
    /// Create every topic with `capacity` buffered events each
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let channel = || broadcast::channel::<PlayerEvent>(capacity).0;
        tracing::debug!("Player streams initialized with capacity {}", capacity);
        Self {
            play: channel(),
            played: channel(),
            song_change: channel(),
            error: channel(),
            ended: channel(),
            layout_touch: channel(),
            layout_ended: channel(),
            song_list_change: channel(),
            locate: channel(),
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<PlayerEvent> {
        match topic {
            Topic::Play => &self.play,
            Topic::Played => &self.played,
            Topic::SongChange => &self.song_change,
            Topic::Error => &self.error,
            Topic::Ended => &self.ended,
            Topic::LayoutTouch => &self.layout_touch,
            Topic::LayoutEnded => &self.layout_ended,
            Topic::SongListChange => &self.song_list_change,
            Topic::Locate => &self.locate,
        }
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<PlayerEvent> {
        self.sender(topic).subscribe()
    }

    /// Publish, ignoring the case where nobody listens
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, topic: Topic, event: PlayerEvent) -> usize {
        let reached = self.sender(topic).send(event).unwrap_or(0);
        tracing::trace!(topic = ?topic, reached, "Broadcast");
        reached
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.sender(topic).receiver_count()
    }
}

/// Every event buffered on `rx`, oldest first
///
/// A lagging receiver skips what it missed and keeps going.
pub fn drain(rx: &mut broadcast::Receiver<PlayerEvent>, topic: Topic) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(topic = ?topic, skipped, "Subscriber lagged, events dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    events
}

impl Default for PlayerStreams {
    fn default() -> Self {
        Self::new(64)
    }
}
