//! Command handlers for the coursepack CLI
//!
//! Each handler wires the library pieces together for one subcommand. The
//! download handler drives a full session: coordinator, engine host, state
//! store, spinner fed from the coordinator broadcast, and Ctrl-C mapped to a
//! cooperative cancel.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use crate::app::classify;
use crate::app::client::{ClientConfig, MoodleClient};
use crate::app::models::PageClassification;
use crate::app::session::{CrawlEngineHost, Phase, SessionCoordinator, SessionState, StateStore};
use crate::cli::args::{DownloadArgs, GlobalArgs, ProbeArgs};

/// Run a full course download session
///
/// Blocks until the session reaches a terminal phase. A failed run returns
/// the session's last message as the error; a cancelled run is not an error.
pub async fn handle_download(args: DownloadArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let store = StateStore::new(
        global
            .state_file
            .clone()
            .unwrap_or_else(StateStore::default_path),
    );
    let config = ClientConfig {
        request_timeout: args.timeout.map(Duration::from_secs),
        ..Default::default()
    };
    let host = Arc::new(CrawlEngineHost::with_config(
        args.url.clone(),
        args.output.clone(),
        config,
    ));
    let coordinator = SessionCoordinator::new(host, store);
    let mut updates = coordinator.subscribe();

    let cancel_coordinator = Arc::clone(&coordinator);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; requesting cancellation");
            let _ = cancel_coordinator.cancel().await;
        }
    });

    let spinner = progress_spinner(global.quiet);
    coordinator.start().await?;

    loop {
        match updates.recv().await {
            Ok(state) => {
                if let Some(spinner) = &spinner {
                    spinner.set_message(state.last_message.clone());
                }
                match state.phase {
                    Phase::Completed => {
                        finish(&spinner, &state.last_message);
                        return Ok(());
                    }
                    Phase::Failed => {
                        finish(&spinner, &state.last_message);
                        bail!("{}", state.last_message);
                    }
                    Phase::Idle => {
                        // Only reachable after cancellation
                        finish(&spinner, "Cancelled");
                        return Ok(());
                    }
                    Phase::Downloading | Phase::Cancelling => {}
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                info!("Progress display lagged by {} updates", skipped);
            }
            Err(RecvError::Closed) => {
                bail!("Session ended without reporting a terminal state")
            }
        }
    }
}

/// Fetch a URL and report how the crawler would treat it
pub async fn handle_probe(args: ProbeArgs) -> anyhow::Result<()> {
    println!(
        "Course URL:    {}",
        if classify::is_course_url(&args.url) {
            "yes"
        } else {
            "no"
        }
    );

    let client = MoodleClient::new().context("Failed to build HTTP client")?;
    let page = client
        .get(&args.url)
        .await
        .with_context(|| format!("Failed to fetch {}", args.url))?;

    println!("Status:        {}", page.status);
    if page.was_redirected_from(&args.url) {
        println!("Final URL:     {}", page.final_url);
    }
    if !page.is_html() {
        println!(
            "Content type:  {}",
            page.content_type.as_deref().unwrap_or("unknown")
        );
        return Ok(());
    }

    let document = page.parse_html();
    if let Some(title) = classify::course_title(&document) {
        println!("Title:         {}", title);
    }
    let role = match classify::classify_page(&page.final_url, &document) {
        PageClassification::Folder(details) if details.is_resolvable() => {
            "folder (archive URL resolvable)"
        }
        PageClassification::Folder(_) => "folder (falls back to child scan)",
        PageClassification::Resource => "resource wrapper",
        PageClassification::PluginFile => "direct file",
        PageClassification::Generic => "generic page",
    };
    println!("Page role:     {}", role);

    let links = classify::course_entry_links(&page.final_url, &document);
    println!("Crawl links:   {}", links.len());
    Ok(())
}

/// Print the persisted session state
pub fn handle_status(global: &GlobalArgs) -> anyhow::Result<()> {
    let store = StateStore::new(
        global
            .state_file
            .clone()
            .unwrap_or_else(StateStore::default_path),
    );
    let state = store
        .load()
        .with_context(|| format!("Failed to read state from {}", store.path().display()))?;

    print_state(&state, store.path().display());
    Ok(())
}

fn print_state(state: &SessionState, location: impl std::fmt::Display) {
    println!("State file:    {}", location);
    println!("Phase:         {:?}", state.phase);
    println!("Active:        {}", state.is_active);
    println!("Engine:        {}", if state.engine_attached { "attached" } else { "detached" });
    println!("Error:         {}", state.has_error);
    println!("Last message:  {}", state.last_message);
}

fn progress_spinner(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    Some(spinner)
}

fn finish(spinner: &Option<ProgressBar>, message: &str) {
    match spinner {
        Some(spinner) => spinner.finish_with_message(message.to_string()),
        None => println!("{}", message),
    }
}
