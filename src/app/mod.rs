//! Core application logic for coursepack
//!
//! This module contains the crawl pipeline (frontier, classifier, filename
//! deriver, archive builder, engine), the HTTP client, and the session
//! coordination layer that relays commands between a UI and the engine.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use coursepack::app::{CrawlEngineHost, SessionCoordinator, StateStore};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let course_url = Url::parse("https://moodle.example.edu/course/view.php?id=42")?;
//! let host = Arc::new(CrawlEngineHost::new(course_url, "downloads"));
//! let coordinator = SessionCoordinator::new(host, StateStore::new("session.json"));
//!
//! let mut updates = coordinator.subscribe();
//! coordinator.start().await?;
//! while let Ok(state) = updates.recv().await {
//!     println!("{}", state.last_message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod classify;
pub mod client;
pub mod engine;
pub mod filename;
pub mod frontier;
pub mod models;
pub mod session;

// Re-export main public API
pub use archive::ArchiveBuilder;
pub use client::{ClientConfig, FetchedPage, MoodleClient};
pub use engine::{CourseArchive, CrawlEngine, RunOutcome};
pub use filename::{derive_filename, sanitize, NameSource};
pub use frontier::LinkFrontier;
pub use models::{DownloadableItem, FolderDetails, ItemKind, PageClassification};
pub use session::{
    CancelAck, CrawlEngineHost, EngineEvent, EngineHost, Phase, SessionCoordinator, SessionState,
    StartAck, StateStore,
};
