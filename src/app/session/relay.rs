//! Command relay between the coordinator and the engine's hosting context
//!
//! The coordinator never talks to `CrawlEngine` directly; it sends commands
//! through an `EngineHost` and receives `EngineEvent`s back on a channel it
//! hands over at start. `CrawlEngineHost` is the in-process implementation:
//! it spawns the run task, owns its cancellation token, forwards progress,
//! and writes the finished archive to disk.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::app::classify;
use crate::app::client::{ClientConfig, MoodleClient};
use crate::app::engine::{CourseArchive, CrawlEngine, RunOutcome};
use crate::errors::{SessionError, SessionResult};

/// Event pushed from the engine's hosting context to the coordinator
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Free-text status update, fire-and-forget
    Progress(String),
    /// Run finished and the archive was delivered
    Completed {
        file_name: String,
        files_added: usize,
    },
    /// Run ended with an error; the reason is the user-facing message
    Failed(String),
    /// Run observed cancellation and stopped cleanly
    Cancelled,
}

/// Engine's response to a start command
#[derive(Debug, Clone)]
pub enum StartAck {
    Accepted,
    Declined(String),
}

/// Engine's response to a cancel command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAck {
    Cancelled,
    Unclear,
}

/// Command surface the coordinator relays through
///
/// Implementations may host the engine in-process or behind a transport; the
/// coordinator only sees acks and the event channel.
#[async_trait]
pub trait EngineHost: Send + Sync {
    /// Ask the host to start a run, delivering events on `events`
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RelayUnreachable` when the command could not
    /// reach a hosting context at all. A reachable host that will not run
    /// answers `StartAck::Declined` instead.
    async fn start(&self, events: mpsc::UnboundedSender<EngineEvent>) -> SessionResult<StartAck>;

    /// Ask the host to cancel the active run
    async fn cancel(&self) -> CancelAck;

    /// Whether the host's context is a course page
    async fn is_course_context(&self) -> bool;
}

/// In-process host running `CrawlEngine` on a spawned task
pub struct CrawlEngineHost {
    course_url: Url,
    output_dir: PathBuf,
    config: ClientConfig,
    cancel: Mutex<Option<CancellationToken>>,
}

impl CrawlEngineHost {
    /// Create a host for one course URL, delivering archives into
    /// `output_dir`
    pub fn new(course_url: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(course_url, output_dir, ClientConfig::default())
    }

    /// Create a host with a custom HTTP client configuration
    pub fn with_config(
        course_url: Url,
        output_dir: impl Into<PathBuf>,
        config: ClientConfig,
    ) -> Self {
        Self {
            course_url,
            output_dir: output_dir.into(),
            config,
            cancel: Mutex::new(None),
        }
    }
}

#[async_trait]
impl EngineHost for CrawlEngineHost {
    async fn start(&self, events: mpsc::UnboundedSender<EngineEvent>) -> SessionResult<StartAck> {
        if !classify::is_course_url(&self.course_url) {
            return Ok(StartAck::Declined("Not a Moodle course page".to_string()));
        }

        let client = MoodleClient::with_config(&self.config)
            .map_err(|e| SessionError::RelayUnreachable(e.to_string()))?;

        let token = CancellationToken::new();
        *self.cancel.lock().await = Some(token.clone());

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let engine = CrawlEngine::new(client, token, progress_tx);
        let course_url = self.course_url.clone();
        let output_dir = self.output_dir.clone();

        let progress_events = events.clone();
        tokio::spawn(async move {
            while let Some(message) = progress_rx.recv().await {
                let _ = progress_events.send(EngineEvent::Progress(message));
            }
        });

        tokio::spawn(async move {
            let event = match engine.run(&course_url).await {
                Ok(RunOutcome::Completed(archive)) => match deliver_archive(&output_dir, &archive)
                {
                    Ok(path) => {
                        info!(
                            "Archive with {} files written to {}",
                            archive.files_added,
                            path.display()
                        );
                        EngineEvent::Completed {
                            file_name: archive.file_name,
                            files_added: archive.files_added,
                        }
                    }
                    Err(e) => {
                        warn!("Failed to write archive: {}", e);
                        EngineEvent::Failed(format!("Failed to save archive: {}", e))
                    }
                },
                Ok(RunOutcome::Cancelled) => EngineEvent::Cancelled,
                Err(e) => EngineEvent::Failed(e.to_string()),
            };
            let _ = events.send(event);
        });

        Ok(StartAck::Accepted)
    }

    async fn cancel(&self) -> CancelAck {
        match self.cancel.lock().await.as_ref() {
            Some(token) => {
                token.cancel();
                CancelAck::Cancelled
            }
            None => CancelAck::Unclear,
        }
    }

    async fn is_course_context(&self) -> bool {
        classify::is_course_url(&self.course_url)
    }
}

/// Write the archive into the output directory atomically
fn deliver_archive(output_dir: &Path, archive: &CourseArchive) -> std::io::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(&archive.file_name);
    let temp_path = path.with_extension("zip.part");
    fs::write(&temp_path, &archive.bytes)?;
    fs::rename(&temp_path, &path)?;
    Ok(path)
}
