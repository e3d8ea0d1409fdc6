//! Crawl engine: link discovery and item download orchestration
//!
//! `CrawlEngine::run` drives the whole pipeline for one course: seed the
//! frontier from the landing page, crawl breadth-first until the frontier is
//! empty, then fetch every resolved item in discovery order and build the
//! archive. Strictly one outstanding fetch at a time; a cancellation token is
//! polled at the top of both loops and immediately after every fetch, so
//! cancellation latency is bounded by a single in-flight request.
//!
//! Per-URL and per-item failures are logged and skipped; only an empty
//! result set escalates to a run-level error.

use regex::Regex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::archive::ArchiveBuilder;
use crate::app::classify;
use crate::app::client::{FetchedPage, MoodleClient};
use crate::app::filename::{derive_filename, NameSource};
use crate::app::frontier::LinkFrontier;
use crate::app::models::{DownloadableItem, ItemKind, PageClassification};
use crate::constants::{archive as archive_consts, moodle};
use crate::errors::{CrawlError, CrawlResult, FetchResult};

/// The finished product of a successful run
#[derive(Debug)]
pub struct CourseArchive {
    /// Archive file name derived from the course title
    pub file_name: String,
    /// Compressed archive bytes
    pub bytes: Vec<u8>,
    /// Number of files packed
    pub files_added: usize,
}

/// How a run ended when it did not fail
#[derive(Debug)]
pub enum RunOutcome {
    /// All phases finished and an archive was produced
    Completed(CourseArchive),
    /// Cancellation was observed at a checkpoint; no archive was built
    Cancelled,
}

/// Result of fetching one item's content
enum ItemContent {
    Fetched(FetchedPage),
    Skipped,
    Cancelled,
}

/// Orchestrates frontier, classifier, resolver, and archive builder
///
/// Owns the frontier and builder exclusively for the lifetime of one `run`
/// invocation; all of its state is discarded when `run` returns.
pub struct CrawlEngine {
    client: MoodleClient,
    cancel: CancellationToken,
    progress: mpsc::UnboundedSender<String>,
}

impl CrawlEngine {
    /// Create an engine bound to a client, a cancellation token, and a
    /// progress sink
    pub fn new(
        client: MoodleClient,
        cancel: CancellationToken,
        progress: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            client,
            cancel,
            progress,
        }
    }

    /// Crawl a course and download everything reachable from it
    ///
    /// # Errors
    ///
    /// Returns `CrawlError` when the starting URL is not a course page, the
    /// scan produced nothing to download, every download failed, or the
    /// archive could not be built. Cancellation is not an error.
    pub async fn run(&self, course_url: &Url) -> CrawlResult<RunOutcome> {
        if !classify::is_course_url(course_url) {
            warn!("Starting URL not recognized as a course page: {}", course_url);
            return Err(CrawlError::NotACoursePage);
        }

        self.report("Scanning course page...");
        let course_page = self.client.get(course_url).await?;
        if self.cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }
        if !course_page.is_success() {
            warn!(
                "Course page fetch returned {} for {}",
                course_page.status, course_url
            );
            return Err(CrawlError::NotACoursePage);
        }

        let origin = site_origin(course_url);
        let mut frontier = LinkFrontier::new();

        // The parsed document stays inside this block: it is not Send and
        // must not be held across an await
        let title = {
            let document = course_page.parse_html();
            for link in classify::course_entry_links(&course_page.final_url, &document) {
                if frontier.enqueue(link.clone()) {
                    debug!("Initial scan: queued {}", link);
                }
            }
            classify::course_title(&document)
        };
        if frontier.is_empty() {
            warn!("No initial links found on {}", course_url);
            return Err(CrawlError::NoInitialLinks);
        }

        let items = match self.discover_items(&mut frontier, &origin).await {
            Some(items) => items,
            None => return Ok(RunOutcome::Cancelled),
        };
        info!("Discovery complete: {} downloadable items", items.len());
        if items.is_empty() {
            return Err(CrawlError::NoItemsAfterScan);
        }

        let builder = match self.download_items(&items).await {
            Some(builder) => builder,
            None => return Ok(RunOutcome::Cancelled),
        };
        if builder.is_empty() {
            warn!("No files were successfully added to the archive");
            return Err(CrawlError::NoFilesArchived);
        }

        let files_added = builder.len();
        self.report(format!("Zipping {} files...", files_added));
        let bytes = builder.build()?;

        Ok(RunOutcome::Completed(CourseArchive {
            file_name: archive_file_name(title.as_deref()),
            bytes,
            files_added,
        }))
    }

    /// Discovery phase: drain the frontier, classifying each page and
    /// collecting downloadable items in discovery order
    ///
    /// Returns `None` when cancellation was observed.
    async fn discover_items(
        &self,
        frontier: &mut LinkFrontier,
        origin: &Url,
    ) -> Option<Vec<DownloadableItem>> {
        let mut items = Vec::new();

        while let Some(current) = frontier.dequeue() {
            if self.cancel.is_cancelled() {
                info!("Cancellation observed during discovery");
                return None;
            }
            self.report(format!(
                "Scanning course pages ({} queued, {} item{} found)...",
                frontier.pending_len() + 1,
                items.len(),
                if items.len() == 1 { "" } else { "s" }
            ));

            let page = match self.client.get(&current).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Error fetching {} during discovery: {}", current, e);
                    continue;
                }
            };
            if self.cancel.is_cancelled() {
                info!("Cancellation observed during discovery");
                return None;
            }
            if !page.is_success() {
                warn!("Failed to fetch {}, status: {}", current, page.status);
                continue;
            }

            let document = page.parse_html();
            match classify::classify_page(&current, &document) {
                PageClassification::Folder(details) if details.is_resolvable() => {
                    if let Some(action) = &details.form_action {
                        debug!("Folder download form action: {}", action);
                    }
                    let archive_url = folder_archive_url(
                        origin,
                        details.folder_id.as_deref().unwrap_or_default(),
                        details.sesskey.as_deref().unwrap_or_default(),
                    );
                    if frontier.mark_resolved(&archive_url) {
                        info!("Constructed folder archive URL: {}", archive_url);
                        items.push(DownloadableItem::new(archive_url, ItemKind::FolderArchive));
                    }
                }
                PageClassification::Folder(_) => {
                    warn!(
                        "Could not construct folder archive URL for {}; scanning children",
                        current
                    );
                    for link in classify::folder_child_links(&page.final_url, &document) {
                        if frontier.enqueue(link.clone()) {
                            debug!("Folder fallback: queued {}", link);
                        }
                    }
                }
                PageClassification::Resource => {
                    debug!("Recorded resource item: {}", current);
                    items.push(DownloadableItem::new(current, ItemKind::SingleFile));
                }
                PageClassification::PluginFile => {
                    debug!("Recorded direct file item: {}", current);
                    items.push(DownloadableItem::new(current, ItemKind::GenericFile));
                }
                PageClassification::Generic => {
                    for link in classify::activity_links(&page.final_url, &document) {
                        if frontier.enqueue(link.clone()) {
                            debug!("General scan: queued {}", link);
                        }
                    }
                }
            }
        }

        Some(items)
    }

    /// Download phase: fetch every item sequentially and collect archive
    /// entries
    ///
    /// Returns `None` when cancellation was observed; no partial archive is
    /// ever produced.
    async fn download_items(&self, items: &[DownloadableItem]) -> Option<ArchiveBuilder> {
        let total = items.len();
        let mut builder = ArchiveBuilder::new();

        for (index, item) in items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Cancellation observed during download");
                return None;
            }
            self.report(format!("Downloading file {} of {}...", index + 1, total));

            let content = match self.fetch_item_content(item).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to fetch item {}: {}", item.url, e);
                    continue;
                }
            };
            let response = match content {
                ItemContent::Fetched(response) => response,
                ItemContent::Skipped => continue,
                ItemContent::Cancelled => {
                    info!("Cancellation observed during download");
                    return None;
                }
            };

            let name = derive_filename(&NameSource {
                disposition: response.content_disposition.as_deref(),
                content_type: response.content_type.as_deref(),
                resolved_url: &response.final_url,
                origin_url: &item.url,
                kind: item.kind,
            });
            info!("Adding {} (from {}) to archive", name, response.final_url);
            builder.add_entry(name, response.body);
        }

        Some(builder)
    }

    /// Resolve an item to its file content
    ///
    /// Resource-wrapper pages get the two-step treatment: a redirect to a
    /// pluginfile URL or non-HTML target is already the file; otherwise the
    /// wrapper is parsed for an embedded pluginfile link. When neither is
    /// found the wrapper body itself is used as the content, even though it
    /// may be an HTML page saved under a file name.
    async fn fetch_item_content(&self, item: &DownloadableItem) -> FetchResult<ItemContent> {
        if !item.needs_wrapper_resolution() {
            let response = self.client.get(&item.url).await?;
            if self.cancel.is_cancelled() {
                return Ok(ItemContent::Cancelled);
            }
            if !response.is_success() {
                warn!("Failed to fetch {}, status: {}", item.url, response.status);
                return Ok(ItemContent::Skipped);
            }
            return Ok(ItemContent::Fetched(response));
        }

        let wrapper = self.client.get(&item.url).await?;
        if self.cancel.is_cancelled() {
            return Ok(ItemContent::Cancelled);
        }
        if !wrapper.is_success() {
            warn!(
                "Failed to fetch resource page {}, status: {}",
                item.url, wrapper.status
            );
            return Ok(ItemContent::Skipped);
        }

        let redirected_to_file = wrapper.was_redirected_from(&item.url)
            && (wrapper
                .final_url
                .as_str()
                .contains(moodle::PLUGIN_FILE_PATH)
                || !wrapper.is_html());
        if redirected_to_file {
            debug!("Redirected from {} to {}", item.url, wrapper.final_url);
            return Ok(ItemContent::Fetched(wrapper));
        }

        let embedded = {
            let document = wrapper.parse_html();
            classify::embedded_pluginfile_link(&wrapper.final_url, &document)
        };
        if let Some(file_url) = embedded {
            debug!("Found embedded file URL on {}: {}", item.url, file_url);
            let file = self.client.get(&file_url).await?;
            if self.cancel.is_cancelled() {
                return Ok(ItemContent::Cancelled);
            }
            if !file.is_success() {
                warn!("Failed to fetch {}, status: {}", file_url, file.status);
                return Ok(ItemContent::Skipped);
            }
            return Ok(ItemContent::Fetched(file));
        }

        // No embedded link found: fall back to the wrapper response body,
        // which may be an HTML page stored under a file name
        warn!(
            "No pluginfile link found on {}; using the page response as content",
            item.url
        );
        Ok(ItemContent::Fetched(wrapper))
    }

    /// Emit a progress event, fire-and-forget
    fn report(&self, message: impl Into<String>) {
        let _ = self.progress.send(message.into());
    }
}

/// The site origin (scheme + host) a course URL belongs to
fn site_origin(course_url: &Url) -> Url {
    let mut origin = course_url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

/// Construct the whole-folder archive download URL
fn folder_archive_url(origin: &Url, folder_id: &str, sesskey: &str) -> Url {
    let mut url = origin.clone();
    url.set_path(moodle::FOLDER_DOWNLOAD_PATH);
    url.query_pairs_mut()
        .clear()
        .append_pair("id", folder_id)
        .append_pair("sesskey", sesskey);
    url
}

/// Archive file name from the course title, sanitized to `[A-Za-z0-9_-]`
fn archive_file_name(title: Option<&str>) -> String {
    let pattern =
        Regex::new(archive_consts::TITLE_SANITIZE_PATTERN).expect("pattern should be valid");
    let stem = title
        .map(|t| pattern.replace_all(t.trim(), "_").into_owned())
        .filter(|s| !s.is_empty() && s.chars().any(|c| c != '_'))
        .unwrap_or_else(|| archive_consts::DEFAULT_ARCHIVE_STEM.to_string());
    format!("{}{}", stem, archive_consts::ARCHIVE_SUFFIX)
}
