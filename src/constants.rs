//! Application constants for Coursepack
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Coursepack/0.1.0 (Course Material Archiver)";

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Moodle URL shapes and page-type markers
pub mod moodle {
    /// Path fragment identifying a folder-view page
    pub const FOLDER_VIEW_PATH: &str = "/mod/folder/view.php";

    /// Path fragment identifying a resource-wrapper page
    pub const RESOURCE_VIEW_PATH: &str = "/mod/resource/view.php";

    /// Path fragment identifying a direct byte-serving URL
    pub const PLUGIN_FILE_PATH: &str = "pluginfile.php";

    /// Script constructing a whole-folder archive download
    pub const FOLDER_DOWNLOAD_PATH: &str = "/mod/folder/download_folder.php";

    /// Script name a failed filename derivation collapses to
    pub const RESOURCE_SCRIPT_NAME: &str = "view.php";

    /// Visible label of the folder bulk-download submit control
    pub const DOWNLOAD_FOLDER_LABEL: &str = "download folder";

    /// Pattern matching the session key embedded in inline script text
    pub const SESSKEY_SCRIPT_PATTERN: &str = r#""sesskey"\s*:\s*"([A-Za-z0-9]+)""#;
}

/// CSS selectors for page classification and link discovery
pub mod selectors {
    /// Activity links scanned off the course landing page
    pub const COURSE_ENTRY_LINKS: &str = "a.aalink.stretched-link, \
         a.grid-section-inner.d-flex.flex-column.h-100, \
         a.aalink[href*=\"/folder/view.php\"], \
         a.aalink[href*=\"/resource/view.php\"]";

    /// Individual file links inside a folder page (archive-URL fallback)
    pub const FOLDER_CHILD_LINKS: &str =
        "a.aalink[href*=\"resource/view.php\"], a[href*=\"pluginfile.php\"]";

    /// Folder/resource links scanned off a generic hub page
    pub const ACTIVITY_LINKS: &str =
        "a.aalink[href*=\"/folder/view.php\"], a.aalink[href*=\"/resource/view.php\"]";

    /// Submit controls considered when locating the folder download form
    pub const SUBMIT_CONTROLS: &str = "button[type=\"submit\"], input[type=\"submit\"]";

    /// Hidden input carrying the session key
    pub const SESSKEY_INPUT: &str = "input[type=\"hidden\"][name=\"sesskey\"]";

    /// Folder id input inside the download form
    pub const FOLDER_ID_INPUT: &str = "input[name=\"id\"]";

    /// Content containers searched for an embedded pluginfile link on a
    /// resource-wrapper page, in priority order
    pub const RESOURCE_CONTENT_CONTAINERS: &[&str] = &[
        "div[role=\"main\"] a[href*=\"pluginfile.php\"]",
        "div.resourceworkaround a[href*=\"pluginfile.php\"]",
        "div.resourcecontent a[href*=\"pluginfile.php\"]",
        "section#region-main a[href*=\"pluginfile.php\"]",
        "section#region-main div.box.generalbox a[href*=\"pluginfile.php\"]",
    ];

    /// Course title candidates on the landing page
    pub const COURSE_TITLE: &str = "h1, .h1, header h1, #page-header h1";
}

/// Filename derivation constants
pub mod filename {
    /// Pattern extracting the filename token from a Content-Disposition
    /// header; group 2 captures a quoted value, group 1 an unquoted one
    pub const DISPOSITION_FILENAME_PATTERN: &str =
        r#"(?i)filename\*?=(?:UTF-8'')?("([^"]*)"|[^;\r\n]+)"#;

    /// Characters allowed in an archive entry name; everything else becomes
    /// an underscore
    pub const SANITIZE_PATTERN: &str = r"[^A-Za-z0-9.\-_\s]";
}

/// Archive naming
pub mod archive {
    /// Archive name used when no course title is discoverable
    pub const DEFAULT_ARCHIVE_STEM: &str = "course_materials";

    /// Suffix appended to the archive name
    pub const ARCHIVE_SUFFIX: &str = ".zip";

    /// Characters allowed in the archive name derived from a course title
    pub const TITLE_SANITIZE_PATTERN: &str = r"[^A-Za-z0-9_\-]+";
}

/// Session coordination constants
pub mod session {
    /// Idle-state progress message
    pub const MSG_READY: &str = "Ready";

    /// Message set when a start command is accepted
    pub const MSG_INITIALIZING: &str = "Initializing download...";

    /// Message set while a cancel command is in flight
    pub const MSG_CANCELLING: &str = "Cancelling...";

    /// Message set when the engine reports successful completion
    pub const MSG_COMPLETE: &str = "Download complete!";

    /// Default file name for the persisted session state record
    pub const STATE_FILE_NAME: &str = "coursepack_session.json";

    /// Capacity of the best-effort state-update broadcast
    pub const UPDATE_CHANNEL_SIZE: usize = 16;
}

// Re-export commonly used constants for convenience
pub use archive::{ARCHIVE_SUFFIX, DEFAULT_ARCHIVE_STEM};
pub use http::USER_AGENT;
pub use moodle::{FOLDER_VIEW_PATH, PLUGIN_FILE_PATH, RESOURCE_VIEW_PATH};
