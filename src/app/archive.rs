//! In-memory archive construction
//!
//! Accumulates named byte blobs as items are downloaded and produces a
//! single deflate-compressed zip on demand. The builder does not deduplicate
//! entry names; when two entries share a name, extraction tools keep the
//! last one written. Entry names are expected to be pre-sanitized.

use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::ArchiveResult;

/// Append-only collection of archive entries with one terminal build step
///
/// Scoped to a single run; `build` consumes the builder and must only be
/// called after the download loop completed with at least one entry.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named blob to the archive
    pub fn add_entry(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        debug!("Adding archive entry: {} ({} bytes)", name, bytes.len());
        self.entries.push((name, bytes));
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries have been added
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Produce the compressed archive from all entries added so far
    pub fn build(self) -> ArchiveResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in &self.entries {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}
