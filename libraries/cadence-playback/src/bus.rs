//! Per-session event bus
//!
//! An arena of subscription slots, one per `emit_event` call. Each slot owns
//! the sending half of an unbounded channel and a child of the session's
//! release token, so releasing the session cancels every subscription in a
//! single pass.
//!
//! ```text
//! AudioSession ──publish──▶ slot(play)        ──▶ EventStream
//!                           slot(timeupdate)  ──▶ EventStream
//!                           slot(layoutTouch) ──▶ EventStream
//!        release() ──cancel root token──▶ every EventStream goes silent
//! ```

use crate::events::{EventKind, PlaybackEvent, SessionId};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;

struct Slot {
    kind: EventKind,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl Slot {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }
}

/// Publish/subscribe registry for one session
pub struct PlaybackEventBus {
    session: SessionId,
    release: CancellationToken,
    slots: Vec<Slot>,
    completed: bool,
}

impl PlaybackEventBus {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            release: CancellationToken::new(),
            slots: Vec::new(),
            completed: false,
        }
    }

    /// Open a stream of `kind` events
    ///
    /// `Unknown`, and any kind requested after the bus completed or was
    /// released, yields a stream that is already terminated.
    pub fn subscribe(&mut self, kind: EventKind) -> EventStream {
        let token = self.release.child_token();
        let (tx, rx) = mpsc::unbounded_channel();

        if kind == EventKind::Unknown || self.completed || self.release.is_cancelled() {
            tracing::trace!(session = %self.session, kind = %kind, "Subscription closed at birth");
            return EventStream::new(kind, self.session, token, None);
        }

        self.slots.push(Slot {
            kind,
            token: token.clone(),
            tx,
        });
        tracing::trace!(session = %self.session, kind = %kind, slots = self.slots.len(), "Subscribed");

        EventStream::new(kind, self.session, token, Some(rx))
    }

    /// Deliver an event to every live subscriber of its kind
    ///
    /// Single-shot subscriptions are dropped after their first delivery.
    /// Returns the number of subscribers reached.
    pub fn publish(&mut self, event: &PlaybackEvent) -> usize {
        if self.completed || self.release.is_cancelled() {
            return 0;
        }

        let kind = event.event;
        let mut delivered = 0;
        self.slots.retain(|slot| {
            if !slot.is_live() {
                return false;
            }
            if slot.kind != kind {
                return true;
            }
            if slot.tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
            !kind.is_single_shot()
        });
        delivered
    }

    /// Terminate every stream after its buffered events
    ///
    /// Used when the resource ends or faults: already delivered events stay
    /// readable, nothing further arrives.
    pub fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.slots.clear();
        tracing::debug!(session = %self.session, "Event bus completed");
    }

    /// Cancel every subscription in one pass
    ///
    /// Streams go silent immediately, including events still buffered.
    pub fn release(&mut self) {
        if self.release.is_cancelled() {
            return;
        }
        self.release.cancel();
        self.slots.clear();
        tracing::debug!(session = %self.session, "Event bus released");
    }

    pub fn is_released(&self) -> bool {
        self.release.is_cancelled()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Live subscribers of `kind`
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.kind == kind && slot.is_live())
            .count()
    }
}

/// Lazy stream of one kind of playback event from one session
pub struct EventStream {
    kind: EventKind,
    session: SessionId,
    token: CancellationToken,
    rx: Option<mpsc::UnboundedReceiver<PlaybackEvent>>,
}

impl EventStream {
    fn new(
        kind: EventKind,
        session: SessionId,
        token: CancellationToken,
        rx: Option<mpsc::UnboundedReceiver<PlaybackEvent>>,
    ) -> Self {
        Self {
            kind,
            session,
            token,
            rx,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Next buffered event, without waiting
    ///
    /// Returns `None` when nothing is buffered or the stream terminated;
    /// `is_terminated` tells the two apart.
    pub fn try_next(&mut self) -> Option<PlaybackEvent> {
        if self.token.is_cancelled() {
            self.rx = None;
            return None;
        }
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                None
            }
        }
    }

    /// Every buffered event, oldest first
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next event
    ///
    /// Resolves to `None` once the stream terminates or its session is
    /// released.
    pub async fn next(&mut self) -> Option<PlaybackEvent> {
        let rx = self.rx.as_mut()?;
        let event = tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            event = rx.recv() => event,
        };
        if event.is_none() {
            self.rx = None;
        }
        event
    }

    /// Whether the stream was observed to end or its session was released
    pub fn is_terminated(&self) -> bool {
        self.rx.is_none() || self.token.is_cancelled()
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("kind", &self.kind)
            .field("session", &self.session)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
