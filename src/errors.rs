//! Error types for Coursepack
//!
//! This module defines the error types for all components of the application.
//! Per-URL and per-item failures during a crawl are recovered locally and
//! never appear here; these types cover run-level and coordinator-level
//! failures only. Messages are written for direct display in the session
//! state, which is the sole diagnostic surface past the coordinator boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching a single URL
///
/// Transport failures only. A non-2xx response is not an error at this
/// layer; the engine inspects the status and skips the URL.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
}

/// Run-level crawl failures
///
/// Each variant is terminal for the run that raised it: the coordinator moves
/// to `Failed` with the display text as the user-visible message. A fresh
/// start command is the only recovery path.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The starting URL is not recognized as a Moodle course page
    #[error("Not a Moodle course page")]
    NotACoursePage,

    /// The course page produced no links to crawl
    #[error("No initial links found")]
    NoInitialLinks,

    /// The full scan finished without resolving a single downloadable item
    #[error("No items found after scan")]
    NoItemsAfterScan,

    /// Every resolved item failed to download
    #[error("No files zipped")]
    NoFilesArchived,

    /// The archive could not be produced from the collected entries
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The course page itself could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Archive construction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Zip entry or central directory write failed
    #[error("Zip generation failed")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while writing the in-memory archive
    #[error("Zip generation failed")]
    Io(#[from] std::io::Error),
}

/// Session coordination and command-relay errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// The command could not reach the engine's hosting context
    #[error("Error starting: {0}")]
    RelayUnreachable(String),

    /// The hosting context was reachable but the engine reported failure
    #[error("{0}")]
    EngineDeclined(String),

    /// Cancellation was forwarded but the engine's acknowledgement was
    /// missing or ambiguous
    #[error("Cancellation attempt made, but state unclear.")]
    AmbiguousCancelAck,
}

/// Persisted-state store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// State file could not be read or written
    #[error("Session state file error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored state record could not be serialized or parsed
    #[error("Session state record is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Crawl error
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    /// Archive error
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Crawl(_) => "crawl",
            AppError::Archive(_) => "archive",
            AppError::Session(_) => "session",
            AppError::Store(_) => "store",
            AppError::Io(_) => "io",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Crawl result type alias
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Archive result type alias
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Session result type alias
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_error_messages_are_user_facing() {
        // The display text is surfaced verbatim in the session state
        assert_eq!(
            CrawlError::NotACoursePage.to_string(),
            "Not a Moodle course page"
        );
        assert_eq!(
            CrawlError::NoInitialLinks.to_string(),
            "No initial links found"
        );
        assert_eq!(
            CrawlError::NoItemsAfterScan.to_string(),
            "No items found after scan"
        );
        assert_eq!(CrawlError::NoFilesArchived.to_string(), "No files zipped");
    }

    #[test]
    fn test_ambiguous_cancel_message() {
        assert_eq!(
            SessionError::AmbiguousCancelAck.to_string(),
            "Cancellation attempt made, but state unclear."
        );
    }

    #[test]
    fn test_error_categories() {
        let err: AppError = CrawlError::NoFilesArchived.into();
        assert_eq!(err.category(), "crawl");

        let err: AppError = SessionError::AmbiguousCancelAck.into();
        assert_eq!(err.category(), "session");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: AppError = StoreError::Io {
            path: PathBuf::from("session.json"),
            source: io,
        }
        .into();
        assert_eq!(err.category(), "store");

        let err: AppError = std::io::Error::new(std::io::ErrorKind::Other, "oops").into();
        assert_eq!(err.category(), "io");
    }
}
