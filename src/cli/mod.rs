//! Command-line interface components
//!
//! This module contains CLI-specific code for coursepack: argument parsing,
//! the download/probe/status command handlers, and the progress display fed
//! from the session coordinator's broadcast.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, DownloadArgs, GlobalArgs, ProbeArgs};
pub use commands::{handle_download, handle_probe, handle_status};
