//! Session coordination: the state machine between the UI and the engine
//!
//! `SessionCoordinator` owns the one `SessionState`, relays start/cancel
//! commands to an `EngineHost`, consumes the engine's progress and terminal
//! events, persists every transition through the `StateStore`, and
//! rebroadcasts snapshots to subscribers. Commands and events are processed
//! one at a time behind an async mutex, so no concurrent state writes are
//! possible.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

pub mod relay;
pub mod state;
pub mod store;

pub use relay::{CancelAck, CrawlEngineHost, EngineEvent, EngineHost, StartAck};
pub use state::{Phase, SessionState};
pub use store::StateStore;

use crate::constants::session;
use crate::errors::{SessionError, SessionResult};

/// Owns `SessionState` and relays commands between the UI and the engine
pub struct SessionCoordinator {
    state: Mutex<SessionState>,
    host: Arc<dyn EngineHost>,
    store: StateStore,
    updates: broadcast::Sender<SessionState>,
}

impl SessionCoordinator {
    /// Create a coordinator, reloading and normalizing any persisted state
    ///
    /// An unreadable state file is logged and replaced with the idle
    /// defaults rather than blocking startup.
    pub fn new(host: Arc<dyn EngineHost>, store: StateStore) -> Arc<Self> {
        let state = match store.load() {
            Ok(state) => state,
            Err(e) => {
                warn!("Could not load persisted session state: {}; starting idle", e);
                SessionState::idle()
            }
        };
        debug!("Session starting in phase {:?}", state.phase);

        let (updates, _) = broadcast::channel(session::UPDATE_CHANNEL_SIZE);
        Arc::new(Self {
            state: Mutex::new(state),
            host,
            store,
            updates,
        })
    }

    /// Subscribe to state snapshots; every transition is rebroadcast
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.updates.subscribe()
    }

    /// Current state snapshot, no transition
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Whether the host's context is a course page
    pub async fn check_course_context(&self) -> bool {
        self.host.is_course_context().await
    }

    /// Handle a start command
    ///
    /// Moves to `Downloading` and forwards start to the engine host. On
    /// accept, a task is spawned to consume the engine's events for the rest
    /// of the run.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when a run is already active, the relay is
    /// unreachable, or the engine declines; the failure reason also lands in
    /// the published state.
    pub async fn start(self: &Arc<Self>) -> SessionResult<()> {
        {
            let mut state = self.state.lock().await;
            if state.is_active {
                return Err(SessionError::EngineDeclined(
                    "A download is already in progress".to_string(),
                ));
            }
            state.is_active = true;
            state.phase = Phase::Downloading;
            state.last_message = session::MSG_INITIALIZING.to_string();
            state.has_error = false;
            state.engine_attached = false;
            self.publish(&state);
        }

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        match self.host.start(events_tx).await {
            Ok(StartAck::Accepted) => {
                {
                    let mut state = self.state.lock().await;
                    state.engine_attached = true;
                    self.publish(&state);
                }
                let coordinator = Arc::clone(self);
                tokio::spawn(async move {
                    while let Some(event) = events_rx.recv().await {
                        coordinator.handle_event(event).await;
                    }
                });
                Ok(())
            }
            Ok(StartAck::Declined(reason)) => {
                self.fail(reason.clone()).await;
                Err(SessionError::EngineDeclined(reason))
            }
            Err(e) => {
                self.fail(e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Handle a cancel command
    ///
    /// A cancel with no active run and no attached engine is a no-op that
    /// resets to idle without forwarding anything. Otherwise the command is
    /// forwarded; a clear ack resets to idle, an unclear one fails the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AmbiguousCancelAck` when the host could not
    /// confirm cancellation.
    pub async fn cancel(&self) -> SessionResult<SessionState> {
        {
            let mut state = self.state.lock().await;
            if !state.is_active && !state.engine_attached {
                debug!("Cancel with no active run; resetting to idle");
                *state = SessionState::idle();
                self.publish(&state);
                return Ok(state.clone());
            }
            state.phase = Phase::Cancelling;
            state.last_message = session::MSG_CANCELLING.to_string();
            self.publish(&state);
        }

        match self.host.cancel().await {
            CancelAck::Cancelled => {
                let mut state = self.state.lock().await;
                *state = SessionState::idle();
                self.publish(&state);
                Ok(state.clone())
            }
            CancelAck::Unclear => {
                self.fail(SessionError::AmbiguousCancelAck.to_string()).await;
                Err(SessionError::AmbiguousCancelAck)
            }
        }
    }

    /// Apply one engine event
    async fn handle_event(&self, event: EngineEvent) {
        let mut state = self.state.lock().await;
        match event {
            EngineEvent::Progress(message) => {
                if !state.is_active && !state.engine_attached {
                    debug!("Dropping progress event with no active run: {}", message);
                    return;
                }
                state.last_message = message;
            }
            EngineEvent::Completed {
                file_name,
                files_added,
            } => {
                info!("Run complete: {} ({} files)", file_name, files_added);
                *state = SessionState::idle();
                state.phase = Phase::Completed;
                state.last_message = session::MSG_COMPLETE.to_string();
            }
            EngineEvent::Failed(reason) => {
                warn!("Run failed: {}", reason);
                *state = SessionState::idle();
                state.phase = Phase::Failed;
                state.last_message = reason;
                state.has_error = true;
            }
            EngineEvent::Cancelled => {
                info!("Run cancelled");
                *state = SessionState::idle();
            }
        }
        self.publish(&state);
    }

    /// Move to `Failed` with a reason
    async fn fail(&self, reason: String) {
        let mut state = self.state.lock().await;
        *state = SessionState::idle();
        state.phase = Phase::Failed;
        state.last_message = reason;
        state.has_error = true;
        self.publish(&state);
    }

    /// Persist and rebroadcast a snapshot; both are best-effort
    fn publish(&self, state: &SessionState) {
        if let Err(e) = self.store.save(state) {
            warn!("Could not persist session state: {}", e);
        }
        let _ = self.updates.send(state.clone());
    }
}
