//! Page classification and link discovery
//!
//! Pure functions over a URL and its parsed HTML document. The classifier
//! decides a fetched page's role (folder listing, resource wrapper, direct
//! file, generic hub) and extracts the role-specific data the crawl engine
//! needs: folder download-form details, the site session key, and further
//! links to extend the frontier.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::app::models::{FolderDetails, PageClassification};
use crate::constants::{moodle, selectors};

/// Whether a URL is recognized as a Moodle course landing page
pub fn is_course_url(url: &Url) -> bool {
    let s = url.as_str();
    s.contains("moodle") && s.contains("course")
}

/// Classify a fetched page by its URL path and document contents
///
/// Folder pages carry whatever download-form data could be extracted; the
/// caller downgrades unresolvable folders to child-link scanning.
pub fn classify_page(url: &Url, document: &Html) -> PageClassification {
    let path = url.as_str();
    if path.contains(moodle::FOLDER_VIEW_PATH) {
        PageClassification::Folder(extract_folder_details(url, document))
    } else if path.contains(moodle::RESOURCE_VIEW_PATH) {
        PageClassification::Resource
    } else if path.contains(moodle::PLUGIN_FILE_PATH) {
        PageClassification::PluginFile
    } else {
        PageClassification::Generic
    }
}

/// Extract the site-wide session key from a page
///
/// Looks for the hidden `sesskey` input first, then falls back to scanning
/// inline script text for a `"sesskey":"..."` literal. Returns `None` when
/// neither is present; this is expected on many pages and non-fatal.
pub fn find_sesskey(document: &Html) -> Option<String> {
    let input_selector =
        Selector::parse(selectors::SESSKEY_INPUT).expect("sesskey selector should be valid");
    if let Some(value) = document
        .select(&input_selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .filter(|v| !v.is_empty())
    {
        return Some(value.to_string());
    }

    let script_selector = Selector::parse("script").expect("script selector should be valid");
    let pattern =
        Regex::new(moodle::SESSKEY_SCRIPT_PATTERN).expect("sesskey pattern should be valid");
    for script in document.select(&script_selector) {
        let text: String = script.text().collect();
        if let Some(captures) = pattern.captures(&text) {
            return Some(captures[1].to_string());
        }
    }
    None
}

/// Extract folder download-form details from a folder-view page
///
/// Locates a submit control whose visible label contains "download folder",
/// walks up to its enclosing form, and reads the folder id input. The id
/// falls back to the page URL's `id` query parameter.
fn extract_folder_details(url: &Url, document: &Html) -> FolderDetails {
    let submit_selector =
        Selector::parse(selectors::SUBMIT_CONTROLS).expect("submit selector should be valid");
    let download_control = document
        .select(&submit_selector)
        .find(|control| control_label_matches(control, moodle::DOWNLOAD_FOLDER_LABEL));

    let form = download_control.and_then(enclosing_form);

    let form_action = form
        .and_then(|f| f.value().attr("action"))
        .or_else(|| download_control.and_then(|c| c.value().attr("formaction")))
        .map(|a| a.to_string());

    // Only a located download form makes the page eligible for direct
    // archive construction; without one the folder is scanned for children
    if form.is_none() {
        debug!("No folder download form found on {}", url);
        return FolderDetails {
            folder_id: None,
            sesskey: find_sesskey(document),
            form_action: None,
        };
    }

    let id_selector =
        Selector::parse(selectors::FOLDER_ID_INPUT).expect("id selector should be valid");
    let folder_id = form
        .and_then(|f| f.select(&id_selector).next())
        .and_then(|input| input.value().attr("value"))
        .map(|v| v.to_string())
        .or_else(|| query_param(url, "id"));

    FolderDetails {
        folder_id,
        sesskey: find_sesskey(document),
        form_action,
    }
}

/// Whether a submit control's visible label or value matches, ignoring case
fn control_label_matches(control: &ElementRef, label: &str) -> bool {
    let text: String = control.text().collect();
    if text.trim().to_lowercase().contains(label) {
        return true;
    }
    control
        .value()
        .attr("value")
        .map(|v| v.trim().to_lowercase().contains(label))
        .unwrap_or(false)
}

/// Nearest `form` ancestor of an element
fn enclosing_form<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "form")
}

/// Activity links scanned off the course landing page
pub fn course_entry_links(base: &Url, document: &Html) -> Vec<Url> {
    collect_links(base, document, selectors::COURSE_ENTRY_LINKS)
}

/// Individual file links inside a folder page (fallback when the folder's
/// archive URL cannot be constructed)
pub fn folder_child_links(base: &Url, document: &Html) -> Vec<Url> {
    collect_links(base, document, selectors::FOLDER_CHILD_LINKS)
}

/// Folder and resource links on a generic hub page
pub fn activity_links(base: &Url, document: &Html) -> Vec<Url> {
    collect_links(base, document, selectors::ACTIVITY_LINKS)
}

/// First embedded pluginfile link on a resource-wrapper page
///
/// The known content containers are tried in priority order; the first
/// selector with any match wins.
pub fn embedded_pluginfile_link(base: &Url, document: &Html) -> Option<Url> {
    for selector_str in selectors::RESOURCE_CONTENT_CONTAINERS {
        let selector = Selector::parse(selector_str).expect("container selector should be valid");
        if let Some(href) = document
            .select(&selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            match base.join(href) {
                Ok(url) => return Some(url),
                Err(e) => warn!("Invalid pluginfile href {}: {}", href, e),
            }
        }
    }
    None
}

/// Course title from the landing page, if any heading is present
pub fn course_title(document: &Html) -> Option<String> {
    let selector =
        Selector::parse(selectors::COURSE_TITLE).expect("title selector should be valid");
    document.select(&selector).next().map(|heading| {
        let text: String = heading.text().collect();
        text.trim().to_string()
    })
}

/// Collect absolute URLs matching a selector, resolved against the page's
/// final URL; unparseable hrefs are logged and skipped
fn collect_links(base: &Url, document: &Html, selector_str: &str) -> Vec<Url> {
    let selector = Selector::parse(selector_str).expect("link selector should be valid");
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| match base.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Skipping unparseable link {}: {}", href, e);
                None
            }
        })
        .collect()
}

/// Read a single query parameter from a URL
fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
