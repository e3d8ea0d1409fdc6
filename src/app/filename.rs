//! Filename derivation for archive entries
//!
//! Computes a safe entry name for downloaded bytes using a priority chain:
//! the `Content-Disposition` header, the resolved URL's last path segment,
//! and finally a synthesized `{kind}_{id}` name with an extension recovered
//! from the declared content type. Sanitization is always applied last and
//! is idempotent, so derivation is deterministic for identical inputs.

use chrono::Utc;
use regex::Regex;
use url::Url;

use crate::app::models::ItemKind;
use crate::constants::{filename as patterns, moodle};

/// Everything the deriver may consult for one downloaded item
#[derive(Debug, Clone, Copy)]
pub struct NameSource<'a> {
    /// `Content-Disposition` response header, if present
    pub disposition: Option<&'a str>,
    /// Declared content type of the response body
    pub content_type: Option<&'a str>,
    /// URL the file bytes were actually fetched from
    pub resolved_url: &'a Url,
    /// Page URL the item was originally recorded from; its `id` query
    /// parameter feeds synthesized names
    pub origin_url: &'a Url,
    /// Kind of the downloaded item
    pub kind: ItemKind,
}

/// Derive the archive entry name for a downloaded item
pub fn derive_filename(source: &NameSource) -> String {
    let mut name = from_content_disposition(source.disposition.unwrap_or_default())
        .or_else(|| from_url_basename(source.resolved_url));

    let needs_synthesis = match &name {
        None => true,
        Some(n) => {
            n.trim().is_empty()
                || (source.kind != ItemKind::FolderArchive && n == moodle::RESOURCE_SCRIPT_NAME)
        }
    };
    if needs_synthesis {
        name = Some(synthesize(source));
    }

    sanitize(&name.unwrap_or_default())
}

/// Filename from a `Content-Disposition: attachment` header
///
/// Prefers the RFC 5987 `filename*=UTF-8''...` form (percent-decoded), then
/// a quoted or unquoted `filename=` token with surrounding quotes stripped.
pub fn from_content_disposition(disposition: &str) -> Option<String> {
    if !disposition.contains("attachment") {
        return None;
    }
    let pattern = Regex::new(patterns::DISPOSITION_FILENAME_PATTERN)
        .expect("disposition pattern should be valid");
    let captures = pattern.captures(disposition)?;

    let raw = captures
        .get(2)
        .or_else(|| captures.get(1))
        .map(|m| m.as_str())?;
    let decoded = urlencoding::decode(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let stripped = decoded.replace(['\'', '"'], "");
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Last path segment of the resolved URL, percent-decoded
pub fn from_url_basename(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(segment)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

/// Synthesize `{kind}_{id-or-millis}` plus a recovered extension
fn synthesize(source: &NameSource) -> String {
    let id = source
        .origin_url
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned());
    let tag = id.unwrap_or_else(|| Utc::now().timestamp_millis().to_string());
    let mut name = format!("{}_{}", source.kind.label(), tag);

    if !name.contains('.') {
        if let Some(ext) = recover_extension(source) {
            name.push('.');
            name.push_str(&ext);
        }
    }
    name
}

/// Best-effort extension from the declared content type and the resolved URL
///
/// Common office MIME subtypes are remapped to their conventional suffixes.
/// A generic octet-stream, or a zip subtype for a URL that does not end in
/// `.zip`, is treated as unreliable and overridden from the URL's own suffix
/// where one is recognizable; folder archives default to zip.
fn recover_extension(source: &NameSource) -> Option<String> {
    let subtype = source.content_type?.split('/').nth(1)?.trim();
    if subtype.is_empty() {
        return None;
    }

    let mut ext = subtype
        .replace(
            "vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
        )
        .replace(
            "vnd.openxmlformats-officedocument.presentationml.presentation",
            "pptx",
        )
        .replace("vnd.ms-powerpoint", "ppt")
        .replace("x-zip-compressed", "zip");

    let url_lower = source.resolved_url.as_str().to_lowercase();
    if ext == "octet-stream" || (ext == "zip" && !url_lower.ends_with(".zip")) {
        ext = if url_lower.ends_with(".pdf") {
            "pdf".to_string()
        } else if url_lower.ends_with(".zip") {
            "zip".to_string()
        } else if url_lower.ends_with(".pptx") {
            "pptx".to_string()
        } else if url_lower.ends_with(".ppt") {
            "ppt".to_string()
        } else if url_lower.ends_with(".docx") {
            "docx".to_string()
        } else if source.kind == ItemKind::FolderArchive {
            "zip".to_string()
        } else {
            String::new()
        };
    }

    if ext.is_empty() || ext == "octet-stream" {
        None
    } else {
        Some(ext)
    }
}

/// Sanitize an entry name
///
/// Replaces every character outside `[A-Za-z0-9.\-_\s]` with an underscore,
/// then collapses whitespace runs to a single underscore. Idempotent.
pub fn sanitize(name: &str) -> String {
    let disallowed = Regex::new(patterns::SANITIZE_PATTERN).expect("pattern should be valid");
    let replaced = disallowed.replace_all(name, "_");
    let whitespace = Regex::new(r"\s+").expect("pattern should be valid");
    whitespace.replace_all(&replaced, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn source<'a>(
        disposition: Option<&'a str>,
        content_type: Option<&'a str>,
        resolved: &'a Url,
        origin: &'a Url,
        kind: ItemKind,
    ) -> NameSource<'a> {
        NameSource {
            disposition,
            content_type,
            resolved_url: resolved,
            origin_url: origin,
            kind,
        }
    }

    #[test]
    fn test_disposition_quoted_filename() {
        let resolved = url("https://moodle.example.edu/pluginfile.php/1/content/x");
        let origin = url("https://moodle.example.edu/mod/resource/view.php?id=7");
        let src = source(
            Some(r#"attachment; filename="My Notes.pdf""#),
            Some("application/pdf"),
            &resolved,
            &origin,
            ItemKind::SingleFile,
        );
        assert_eq!(derive_filename(&src), "My_Notes.pdf");
    }

    #[test]
    fn test_disposition_extended_utf8_filename() {
        let name =
            from_content_disposition("attachment; filename*=UTF-8''Vorlesung%2012.pdf").unwrap();
        assert_eq!(name, "Vorlesung 12.pdf");
    }

    #[test]
    fn test_disposition_requires_attachment() {
        assert_eq!(
            from_content_disposition(r#"inline; filename="preview.pdf""#),
            None
        );
    }

    #[test]
    fn test_url_basename_fallback() {
        let resolved =
            url("https://moodle.example.edu/pluginfile.php/9/mod_resource/content/1/week%201.pdf");
        let origin = url("https://moodle.example.edu/mod/resource/view.php?id=7");
        let src = source(None, None, &resolved, &origin, ItemKind::SingleFile);
        assert_eq!(derive_filename(&src), "week_1.pdf");
    }

    #[test]
    fn test_view_php_triggers_synthesis() {
        // Both header and URL parsing failed to find a real name; the
        // originating page's id parameter names the entry instead
        let resolved = url("https://moodle.example.edu/mod/resource/view.php?id=7");
        let origin = url("https://moodle.example.edu/mod/resource/view.php?id=7");
        let src = source(
            None,
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            &resolved,
            &origin,
            ItemKind::SingleFile,
        );
        assert_eq!(derive_filename(&src), "file_7.docx");
    }

    #[test]
    fn test_octet_stream_overridden_by_url_suffix() {
        let resolved = url("https://moodle.example.edu/mod/resource/view.php");
        let origin = url("https://moodle.example.edu/mod/resource/view.php?id=12");
        let mut src = source(
            None,
            Some("application/octet-stream"),
            &resolved,
            &origin,
            ItemKind::SingleFile,
        );
        // No recognizable suffix on the URL and not a folder: no extension
        assert_eq!(derive_filename(&src), "file_12");

        let pdf_resolved = url("https://moodle.example.edu/mod/resource/view.php?file=notes.pdf");
        src.resolved_url = &pdf_resolved;
        assert_eq!(derive_filename(&src), "file_12.pdf");
    }

    #[test]
    fn test_folder_archive_defaults_to_zip() {
        // A resolved URL with no usable basename forces synthesis; the
        // folder kind supplies the zip default
        let resolved = url("https://moodle.example.edu/?id=5&sesskey=a");
        let src = source(
            None,
            Some("application/octet-stream"),
            &resolved,
            &resolved,
            ItemKind::FolderArchive,
        );
        assert_eq!(derive_filename(&src), "folder_zip_5.zip");
    }

    #[test]
    fn test_suspicious_zip_mismatch_checks_url() {
        // Declared zip but the URL ends in .pptx: the URL wins
        let resolved = url("https://moodle.example.edu/mod/resource/view.php?f=slides.pptx");
        let origin = url("https://moodle.example.edu/mod/resource/view.php?id=3");
        let src = source(
            None,
            Some("application/x-zip-compressed"),
            &resolved,
            &origin,
            ItemKind::SingleFile,
        );
        assert_eq!(derive_filename(&src), "file_3.pptx");
    }

    #[test]
    fn test_sanitize_replaces_and_collapses() {
        assert_eq!(sanitize("Notes: week #1 (final).pdf"), "Notes__week__1__final_.pdf");
        assert_eq!(sanitize("a   b\tc"), "a_b_c");
    }

    #[test]
    fn test_sanitize_idempotent() {
        let once = sanitize("Vorlesung 12: Einführung?.pdf");
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_derivation_deterministic() {
        let resolved = url("https://moodle.example.edu/pluginfile.php/1/content/week1.pdf");
        let origin = url("https://moodle.example.edu/mod/resource/view.php?id=7");
        let src = source(
            Some(r#"attachment; filename="Week 1.pdf""#),
            Some("application/pdf"),
            &resolved,
            &origin,
            ItemKind::SingleFile,
        );
        assert_eq!(derive_filename(&src), derive_filename(&src));
    }
}
