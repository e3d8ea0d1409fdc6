//! Durable session state persistence
//!
//! One JSON record on disk, written atomically (temp file + rename) so a
//! crash mid-write never leaves a torn record. A missing file reads as the
//! idle defaults; a reloaded record is normalized for process start.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::app::session::state::SessionState;
use crate::constants::session;
use crate::errors::{StoreError, StoreResult};

/// Reads and writes the persisted `SessionState` record
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default state file location in the system temp directory
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(session::STATE_FILE_NAME)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, normalized for process start
    ///
    /// A missing file is not an error and yields the idle defaults.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the file exists but cannot be read or
    /// parsed.
    pub fn load(&self) -> StoreResult<SessionState> {
        if !self.path.exists() {
            debug!("No state file at {}; starting idle", self.path.display());
            return Ok(SessionState::idle());
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let state: SessionState = serde_json::from_str(&raw)?;
        Ok(state.normalized())
    }

    /// Persist a state snapshot atomically
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when serialization or the write/rename fails.
    pub fn save(&self, state: &SessionState) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(state)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, json).map_err(|source| StoreError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!("Persisted session state to {}", self.path.display());
        Ok(())
    }
}
