//! HTTP client for Moodle page and file fetches
//!
//! One GET shape serves both discovery and download: given a URL, return the
//! final URL after redirects, the response status, the headers the filename
//! deriver cares about, and the body as bytes. Transport failures are the
//! only errors at this layer; non-2xx statuses are returned to the caller,
//! which decides whether to skip or fail.

use reqwest::header;
use reqwest::{Client, StatusCode};
use scraper::Html;
use url::Url;

use crate::errors::FetchResult;

pub mod config;

pub use config::ClientConfig;

/// A completed fetch: status, final URL, relevant headers, body bytes
#[derive(Debug)]
pub struct FetchedPage {
    /// URL the response actually came from, after redirects
    pub final_url: Url,
    /// Response status
    pub status: StatusCode,
    /// Declared content type, if any
    pub content_type: Option<String>,
    /// Content-Disposition header, if any
    pub content_disposition: Option<String>,
    /// Body as bytes
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Whether the response status is 2xx
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the response declares an HTML body
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false)
    }

    /// Whether the fetch was redirected away from the requested URL
    pub fn was_redirected_from(&self, requested: &Url) -> bool {
        self.final_url != *requested
    }

    /// Parse the body as an HTML document
    pub fn parse_html(&self) -> Html {
        Html::parse_document(&String::from_utf8_lossy(&self.body))
    }
}

/// HTTP client for interacting with a Moodle site
///
/// Follows redirects transparently and carries cookies so that a session
/// established by the caller's browsing context keeps working. Strictly one
/// request at a time by construction: the engine owns the client and awaits
/// every fetch before issuing the next.
#[derive(Debug, Clone)]
pub struct MoodleClient {
    client: Client,
}

impl MoodleClient {
    /// Creates a new client with default configuration
    pub fn new() -> FetchResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: &ClientConfig) -> FetchResult<Self> {
        let client = config.build_http_client()?;
        Ok(Self { client })
    }

    /// Fetch a URL, following redirects, returning status/headers/body
    ///
    /// # Errors
    ///
    /// Returns `FetchError` only for transport failures; error statuses are
    /// reported through `FetchedPage::status`.
    pub async fn get(&self, url: &Url) -> FetchResult<FetchedPage> {
        let response = self.client.get(url.as_str()).send().await?;

        let final_url = response.url().clone();
        let status = response.status();
        let content_type = header_value(&response, header::CONTENT_TYPE);
        let content_disposition = header_value(&response, header::CONTENT_DISPOSITION);
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            "Fetched {} -> {} ({}, {} bytes)",
            url,
            final_url,
            status,
            body.len()
        );

        Ok(FetchedPage {
            final_url,
            status,
            content_type,
            content_disposition,
            body,
        })
    }
}

fn header_value(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
