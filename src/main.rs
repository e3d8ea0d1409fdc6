//! coursepack CLI application
//!
//! Command-line interface for bulk-downloading Moodle course materials.
//! Crawls a course page, resolves every folder and resource to its files,
//! and delivers a single zip archive with live progress and Ctrl-C
//! cancellation.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use coursepack::cli::{handle_download, handle_probe, handle_status, Cli, Commands};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(&cli);

    info!("coursepack v{} starting", env!("CARGO_PKG_VERSION"));

    // Execute the appropriate command
    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, &cli.global).await
        }
        Commands::Probe(args) => {
            info!("Executing probe command");
            handle_probe(args).await
        }
        Commands::Status => {
            info!("Executing status command");
            handle_status(&cli.global)
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("coursepack={}", log_level).parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
