//! Point index: key to record location.
//!
//! The index file is a JSON object mapping string keys to
//! `{"segmentIndex":N,"offset":M,"length":L}`. It is loaded once when the
//! scope initializes and is read-only afterwards; the engine never writes it.

use crate::dir::ScopeDir;
use crate::error::{CoreError, CoreResult};
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Location and length of one indexed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Segment holding the record.
    #[serde(alias = "backupFileIndex")]
    pub segment_index: u64,
    /// Offset of the record within the segment.
    pub offset: u64,
    /// Record length in bytes.
    pub length: u64,
}

impl IndexEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(segment_index: u64, offset: u64, length: u64) -> Self {
        Self {
            segment_index,
            offset,
            length,
        }
    }

    /// Returns the entry's address as a [`Location`].
    #[must_use]
    pub const fn location(&self) -> Location {
        Location::new(self.segment_index, self.offset)
    }
}

/// Read-only key to location map of one scope.
#[derive(Debug, Default)]
pub struct ScopeIndex {
    path: PathBuf,
    entries: HashMap<String, IndexEntry>,
}

impl ScopeIndex {
    /// Loads the index file of `dir`; a missing file yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIndex` if the file exists but cannot be parsed.
    pub fn load(dir: &ScopeDir) -> CoreResult<Self> {
        let path = dir.index_path();
        if !path.is_file() {
            tracing::info!(path = %path.display(), "scope index does not exist");
            return Ok(Self {
                path,
                entries: HashMap::new(),
            });
        }

        let data = fs::read(&path)?;
        let entries: HashMap<String, IndexEntry> =
            serde_json::from_slice(&data).map_err(|e| CoreError::InvalidIndex {
                path: path.clone(),
                message: e.to_string(),
            })?;
        tracing::info!(path = %path.display(), entries = entries.len(), "scope index loaded");

        Ok(Self { path, entries })
    }

    /// Looks up a key.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<IndexEntry> {
        self.entries.get(key).copied()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over indexed keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the index file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
