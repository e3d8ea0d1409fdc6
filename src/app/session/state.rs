//! Session state shared between the coordinator, the store, and observers
//!
//! `SessionState` is the single source of truth the UI renders from. It is
//! owned exclusively by the coordinator, persisted on every transition, and
//! rebroadcast as a full snapshot. The serialized field names are camelCase
//! to match the stored record layout.

use serde::{Deserialize, Serialize};

use crate::constants::session;

/// UI-facing phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Downloading,
    Cancelling,
    Completed,
    Failed,
}

/// Snapshot of the session, persisted on every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Whether a run is currently active
    pub is_active: bool,
    /// UI-facing phase
    pub phase: Phase,
    /// Last human-readable status message; the sole surfaced diagnostic
    pub last_message: String,
    /// Whether the last run ended in error
    pub has_error: bool,
    /// Whether the engine has acknowledged the start command
    pub engine_attached: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_active: false,
            phase: Phase::Idle,
            last_message: session::MSG_READY.to_string(),
            has_error: false,
            engine_attached: false,
        }
    }
}

impl SessionState {
    /// The idle default state
    pub fn idle() -> Self {
        Self::default()
    }

    /// Normalize a reloaded state for process start
    ///
    /// `Downloading` and `Cancelling` cannot be valid across a restart since
    /// no engine is running to complete them; both collapse to the idle
    /// defaults. Terminal phases are kept as-is.
    pub fn normalized(self) -> Self {
        match self.phase {
            Phase::Downloading | Phase::Cancelling => Self::idle(),
            _ => self,
        }
    }
}
