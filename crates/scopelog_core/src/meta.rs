//! Persistent cursor set.
//!
//! The meta file holds the three cursors of a scope as one JSON document:
//!
//! ```text
//! {"readStart":{"segmentIndex":0,"offset":8},
//!  "readEnd":{"segmentIndex":0,"offset":53},
//!  "writeStart":{"segmentIndex":0,"offset":54}}
//! ```
//!
//! Setters only touch memory and mark the set dirty. [`ScopeMeta::commit`]
//! rewrites the whole document when dirty, so a crash loses at most the
//! progress since the last commit and never leaves a half-written file.

use crate::dir::ScopeDir;
use crate::error::{CoreError, CoreResult};
use crate::location::Location;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The cursor triple as stored on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    /// First unread byte.
    pub read_start: Location,
    /// Last byte published by the writer.
    pub read_end: Location,
    /// Where the next frame will be written.
    pub write_start: Location,
}

impl MetaInfo {
    /// Reads a meta file without taking ownership of it.
    ///
    /// Used by tooling that must not create or rewrite anything.
    pub fn read_from(path: &Path) -> CoreResult<Self> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| CoreError::InvalidMeta {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug)]
struct MetaState {
    info: MetaInfo,
    dirty: bool,
}

/// In-memory cursor set bound to a scope's meta file.
///
/// # Thread Safety
///
/// Getters take a read lock and return copies; setters and `commit` take the
/// write lock. There is exactly one `ScopeMeta` per initialized scope.
#[derive(Debug)]
pub struct ScopeMeta {
    dir: ScopeDir,
    path: PathBuf,
    state: RwLock<MetaState>,
}

impl ScopeMeta {
    /// Loads the meta file of `dir`, creating it with zeroed cursors if absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMeta` if the file exists but cannot be parsed, or an
    /// I/O error if the initial file cannot be written.
    pub fn load(dir: &ScopeDir) -> CoreResult<Self> {
        let path = dir.meta_path();

        if path.is_file() {
            let info = MetaInfo::read_from(&path)?;
            tracing::info!(
                path = %path.display(),
                read_start = %info.read_start,
                read_end = %info.read_end,
                write_start = %info.write_start,
                "scope meta loaded"
            );
            return Ok(Self {
                dir: dir.clone(),
                path,
                state: RwLock::new(MetaState { info, dirty: false }),
            });
        }

        tracing::info!(path = %path.display(), "scope meta absent, initializing");
        let meta = Self {
            dir: dir.clone(),
            path,
            state: RwLock::new(MetaState {
                info: MetaInfo::default(),
                dirty: true,
            }),
        };
        meta.commit()?;
        Ok(meta)
    }

    /// Returns the meta file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the read start cursor.
    #[must_use]
    pub fn read_start(&self) -> Location {
        self.state.read().info.read_start
    }

    /// Returns the read end cursor.
    #[must_use]
    pub fn read_end(&self) -> Location {
        self.state.read().info.read_end
    }

    /// Returns the write start cursor.
    #[must_use]
    pub fn write_start(&self) -> Location {
        self.state.read().info.write_start
    }

    /// Returns all three cursors under one lock acquisition.
    #[must_use]
    pub fn snapshot(&self) -> MetaInfo {
        self.state.read().info
    }

    /// Replaces the read start cursor.
    pub fn set_read_start(&self, location: Location) {
        let mut state = self.state.write();
        state.info.read_start = location;
        state.dirty = true;
    }

    /// Replaces the read end cursor.
    pub fn set_read_end(&self, location: Location) {
        let mut state = self.state.write();
        state.info.read_end = location;
        state.dirty = true;
    }

    /// Replaces the write start cursor.
    pub fn set_write_start(&self, location: Location) {
        let mut state = self.state.write();
        state.info.write_start = location;
        state.dirty = true;
    }

    /// Returns true if in-memory cursors differ from the last commit.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Persists the cursor triple if it changed since the last commit.
    ///
    /// Returns `true` if the file was rewritten, `false` if it was already
    /// in sync.
    pub fn commit(&self) -> CoreResult<bool> {
        let mut state = self.state.write();
        if !state.dirty {
            return Ok(false);
        }

        let data = serde_json::to_vec(&state.info).map_err(|e| CoreError::InvalidMeta {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        self.dir.write_atomic(&self.path, &data)?;
        state.dirty = false;

        tracing::debug!(path = %self.path.display(), "scope meta committed");
        Ok(true)
    }
}
