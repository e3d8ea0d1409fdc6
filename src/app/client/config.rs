//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! used for all Moodle page and file fetches.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::{FetchError, FetchResult};

/// Configuration for the crawl HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-request timeout; `None` means a hung fetch stalls the run, which
    /// is the reference behavior
    pub request_timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Maximum redirects to follow transparently
    pub max_redirects: usize,
    /// Carry cookies between requests; the caller's browsing session is
    /// assumed to have established them
    pub cookie_store: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            connect_timeout: http::CONNECT_TIMEOUT,
            max_redirects: http::MAX_REDIRECTS,
            cookie_store: true,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> FetchResult<Client> {
        let mut builder = Client::builder()
            .cookie_store(self.cookie_store)
            .connect_timeout(self.connect_timeout)
            .redirect(Policy::limited(self.max_redirects))
            .user_agent(http::USER_AGENT);

        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(FetchError::Http)
    }
}
