//! Command-line argument parsing for coursepack
//!
//! This module defines the CLI structure using clap derive macros: one
//! download command plus small probe/status helpers for inspecting a URL and
//! the persisted session state.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use url::Url;

/// coursepack - Download a Moodle course's materials as one zip archive
#[derive(Parser, Debug)]
#[command(
    name = "coursepack",
    version,
    about = "Download every file reachable from a Moodle course page into one zip archive",
    long_about = "Crawls a Moodle course landing page, resolves folders and resources to their \
downloadable files, and packages everything into a single zip archive. The crawl is strictly \
sequential and can be cancelled at any time with Ctrl-C."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Parse arguments from the process environment
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level implied by the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.global.very_verbose {
            "debug"
        } else if self.global.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress the progress display
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Session state file path (default: system temp directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub state_file: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a course's materials into a zip archive
    Download(DownloadArgs),

    /// Fetch a URL and report how it would be classified
    Probe(ProbeArgs),

    /// Show the persisted session state
    Status,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Course landing page URL
    pub url: Url,

    /// Directory the archive is written into
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output: PathBuf,

    /// Per-request timeout in seconds (no timeout when omitted)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the probe command
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// URL to fetch and classify
    pub url: Url,
}
