//! Data models for crawl and download operations
//!
//! This module defines the core data structures shared between the page
//! classifier, the crawl engine, and the filename deriver.

use url::Url;

use crate::constants::moodle;

/// Kind of a resolved downloadable item
///
/// The kind decides how the download phase treats the item's URL: a
/// `SingleFile` points at a resource-wrapper page that still needs a second
/// resolution step, while the other two kinds are fetched directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Constructed whole-folder archive download URL
    FolderArchive,
    /// Resource-wrapper page hiding exactly one file
    SingleFile,
    /// Direct byte-serving URL discovered as-is
    GenericFile,
}

impl ItemKind {
    /// Stable label used in synthesized filenames
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::FolderArchive => "folder_zip",
            ItemKind::SingleFile => "file",
            ItemKind::GenericFile => "file",
        }
    }
}

/// A resolved (URL, kind) pair ready for content fetch
///
/// Created during discovery, consumed exactly once by the download phase,
/// never mutated. Identity is the URL; the frontier's seen-set guarantees no
/// duplicates are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadableItem {
    /// Absolute target URL
    pub url: Url,
    /// How the download phase should treat the URL
    pub kind: ItemKind,
}

impl DownloadableItem {
    /// Create a new downloadable item
    pub fn new(url: Url, kind: ItemKind) -> Self {
        Self { url, kind }
    }

    /// Whether the item's URL is a resource-wrapper page that needs the
    /// two-step resolution before its bytes can be fetched
    pub fn needs_wrapper_resolution(&self) -> bool {
        self.kind == ItemKind::SingleFile && self.url.path().contains(moodle::RESOURCE_VIEW_PATH)
    }
}

/// Data extracted from a folder-view page
///
/// All fields are optional; the engine constructs a direct archive-download
/// URL only when both `folder_id` and `sesskey` are present, and otherwise
/// falls back to scanning the folder's child links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderDetails {
    /// Folder id from the download form, or the page URL's `id` parameter
    pub folder_id: Option<String>,
    /// Site-wide anti-forgery session key
    pub sesskey: Option<String>,
    /// Action attribute of the download form, if one was located
    pub form_action: Option<String>,
}

impl FolderDetails {
    /// Whether enough data was extracted to construct the archive URL
    pub fn is_resolvable(&self) -> bool {
        self.folder_id.is_some() && self.sesskey.is_some()
    }
}

/// Role of a fetched page, derived from its URL and document
///
/// Derived during discovery and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageClassification {
    /// Folder-listing page, with whatever download-form data was found
    Folder(FolderDetails),
    /// Resource-wrapper page around a single file
    Resource,
    /// Direct byte-serving URL
    PluginFile,
    /// Any other page; scanned for further activity links
    Generic,
}
