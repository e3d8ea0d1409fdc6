//! Crawl frontier: pending URLs plus the seen-set
//!
//! The frontier drives the breadth-first discovery loop. A FIFO queue keeps
//! course-level links ahead of deeply nested ones, and a single seen-set
//! covers both scheduled page visits and recorded downloadable items, so no
//! URL is ever fetched twice in one run.

use std::collections::{HashSet, VecDeque};

use tracing::debug;
use url::Url;

/// FIFO queue of URLs to visit with built-in deduplication
///
/// Scoped to one crawl run and owned exclusively by it. The seen-set is
/// keyed by the normalized absolute URL string, and insertion into it is
/// atomic with enqueueing or item recording.
#[derive(Debug, Default)]
pub struct LinkFrontier {
    pending: VecDeque<Url>,
    seen: HashSet<String>,
}

impl LinkFrontier {
    /// Create an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a URL for visiting
    ///
    /// Returns `true` if the URL was newly scheduled, `false` if it was
    /// already visited, scheduled, or recorded as an item.
    pub fn enqueue(&mut self, url: Url) -> bool {
        if !self.seen.insert(url.as_str().to_string()) {
            debug!("Skipping already-seen URL: {}", url);
            return false;
        }
        self.pending.push_back(url);
        true
    }

    /// Take the next URL to visit, oldest first
    pub fn dequeue(&mut self) -> Option<Url> {
        self.pending.pop_front()
    }

    /// Record a resolved item URL in the seen-set without scheduling a visit
    ///
    /// Returns `true` if the URL was new. Used to deduplicate downloadable
    /// items against both earlier items and page visits.
    pub fn mark_resolved(&mut self, url: &Url) -> bool {
        self.seen.insert(url.as_str().to_string())
    }

    /// Whether any URLs remain to visit
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of URLs waiting to be visited
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct URLs ever scheduled or recorded
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}
