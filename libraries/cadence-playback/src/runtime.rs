//! Player event loop
//!
//! Everything runs on one task: host messages (native media events and UI
//! commands) and the retry backoff timer are multiplexed with `select!`.
//! After every wakeup the retry coordinator and the progress tracker catch
//! up with what the orchestrator broadcast.

use crate::error::Result;
use crate::events::{NativeEvent, SessionId};
use crate::orchestrator::{Command, PlayerOrchestrator};
use crate::progress::{ProgressTracker, ProgressWindow};
use crate::retry::RetryCoordinator;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Input to the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// The media resource opened for `session` raised `event`
    Native {
        session: SessionId,
        event: NativeEvent,
    },
    /// A UI command
    Command(Command),
    /// Stop the loop
    Shutdown,
}

/// Channel the host posts `HostMessage`s on
pub fn host_channel() -> (
    mpsc::UnboundedSender<HostMessage>,
    mpsc::UnboundedReceiver<HostMessage>,
) {
    mpsc::unbounded_channel()
}

pub struct PlayerRuntime {
    orchestrator: PlayerOrchestrator,
    coordinator: RetryCoordinator,
    tracker: ProgressTracker,
    inbox: mpsc::UnboundedReceiver<HostMessage>,
    progress: Option<watch::Sender<ProgressWindow>>,
}

impl PlayerRuntime {
    /// Wire the components together
    ///
    /// `inbox` is the receiving half of [`host_channel`]; the host keeps the
    /// sender, usually inside its `MediaBackend`.
    pub fn new(
        orchestrator: PlayerOrchestrator,
        coordinator: RetryCoordinator,
        tracker: ProgressTracker,
        inbox: mpsc::UnboundedReceiver<HostMessage>,
    ) -> Self {
        Self {
            orchestrator,
            coordinator,
            tracker,
            inbox,
            progress: None,
        }
    }

    /// Publish every progress change on a watch channel
    pub fn watch_progress(&mut self) -> watch::Receiver<ProgressWindow> {
        let (tx, rx) = watch::channel(self.tracker.window());
        self.progress = Some(tx);
        rx
    }

    pub fn orchestrator(&self) -> &PlayerOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut PlayerOrchestrator {
        &mut self.orchestrator
    }

    pub fn coordinator(&self) -> &RetryCoordinator {
        &self.coordinator
    }

    pub fn progress(&self) -> ProgressWindow {
        self.tracker.window()
    }

    /// Apply one message and let the coordinators catch up
    ///
    /// # Errors
    /// Only `ListExhausted` is returned; command errors are logged.
    pub fn handle(&mut self, message: HostMessage) -> Result<()> {
        match message {
            HostMessage::Native { session, event } => {
                self.orchestrator.handle_native(session, event);
            }
            HostMessage::Command(command) => {
                if let Err(e) = self.orchestrator.execute(command) {
                    tracing::warn!(error = %e, "Command rejected");
                }
            }
            HostMessage::Shutdown => {}
        }
        self.settle()
    }

    /// Run the coordinators against the current state
    pub fn settle(&mut self) -> Result<()> {
        let result = self
            .coordinator
            .poll(&mut self.orchestrator, Instant::now().into_std());

        if let Some(window) = self.tracker.poll(&mut self.orchestrator) {
            if let Some(progress) = self.progress.as_ref() {
                progress.send_replace(window);
            }
        }
        result
    }

    /// Run until shutdown, the host hangs up, or the playlist is exhausted
    ///
    /// # Errors
    /// Returns `ListExhausted` once every retry budget is spent. The
    /// orchestrator is halted in the `Failed` state and the runtime can be
    /// inspected afterwards.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Player runtime started");
        loop {
            let deadline = self.coordinator.next_deadline().map(Instant::from_std);

            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                message = self.inbox.recv() => match message {
                    Some(HostMessage::Shutdown) | None => break,
                    Some(message) => self.handle(message)?,
                },

                () = sleep_until(deadline) => self.settle()?,
            }
        }
        tracing::info!("Player runtime stopped");
        Ok(())
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for PlayerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerRuntime")
            .field("orchestrator", &self.orchestrator)
            .field("coordinator", &self.coordinator)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}
