//! Coursepack Library
//!
//! A Rust library for crawling a Moodle course landing page, resolving every
//! reachable file, and packaging the lot into a single zip archive. Provides
//! a cancellable crawl engine and a session coordinator suitable for driving
//! from an external UI.

pub mod app;
pub mod cli;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
