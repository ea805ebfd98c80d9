//! Scope directory management.
//!
//! This module handles the file system layout of one backup scope:
//!
//! ```text
//! <parent>/<scope_id>/
//! ├─ scope.meta        # Cursor triple (read start, read end, write start)
//! ├─ scope.idx         # Optional key -> location index
//! ├─ scope.backup_0    # Segment files, zero-based
//! └─ scope.backup_1
//! ```
//!
//! The meta file is replaced atomically; segment files are created by the
//! write path and never deleted here.

use crate::error::{CoreError, CoreResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File names within the scope directory.
const META_FILE: &str = "scope.meta";
const INDEX_FILE: &str = "scope.idx";
const SEGMENT_PREFIX: &str = "scope.backup_";
/// Prefix of generated scope identifiers.
const SCOPE_ID_PREFIX: &str = "backup_scope_";

/// Generates a fresh scope identifier.
#[must_use]
pub fn generate_scope_id() -> String {
    format!("{SCOPE_ID_PREFIX}{}", Uuid::new_v4())
}

/// Checks that a scope identifier names a single directory entry.
pub fn validate_scope_id(id: &str) -> CoreResult<()> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || id.contains('\0');
    if invalid {
        return Err(CoreError::InvalidScopeId { id: id.to_owned() });
    }
    Ok(())
}

/// Resolved paths of one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDir {
    path: PathBuf,
}

impl ScopeDir {
    /// Resolves `<parent>/<scope_id>` without touching the file system.
    #[must_use]
    pub fn new(parent: &Path, scope_id: &str) -> Self {
        Self {
            path: parent.join(scope_id),
        }
    }

    /// Creates the scope directory if absent, reuses it if present.
    ///
    /// Returns `true` when an existing directory was reattached.
    pub fn create_or_reuse(&self) -> CoreResult<bool> {
        if self.path.is_dir() {
            tracing::info!(path = %self.path.display(), "backup scope directory exists");
            return Ok(true);
        }
        if self.path.exists() {
            return Err(CoreError::invalid_operation(format!(
                "scope path is not a directory: {}",
                self.path.display()
            )));
        }
        fs::create_dir_all(&self.path)?;
        tracing::info!(path = %self.path.display(), "backup scope directory created");
        Ok(false)
    }

    /// Returns the scope directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the directory exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Returns the path to the meta file.
    #[must_use]
    pub fn meta_path(&self) -> PathBuf {
        self.path.join(META_FILE)
    }

    /// Returns the path to the index file.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.path.join(INDEX_FILE)
    }

    /// Returns the path to a segment file.
    #[must_use]
    pub fn segment_path(&self, segment_index: u64) -> PathBuf {
        self.path.join(format!("{SEGMENT_PREFIX}{segment_index}"))
    }

    /// Lists the indices of segment files present on disk, ascending.
    pub fn segment_indices(&self) -> CoreResult<Vec<u64>> {
        let mut indices = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(index) = name
                .strip_prefix(SEGMENT_PREFIX)
                .and_then(|suffix| suffix.parse::<u64>().ok())
            {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// Replaces `target` with `data` atomically.
    ///
    /// Uses write-then-rename:
    /// 1. Write to a sibling temporary file
    /// 2. Sync the temporary file
    /// 3. Rename over the target
    /// 4. Fsync the directory so the rename is durable
    pub fn write_atomic(&self, target: &Path, data: &[u8]) -> CoreResult<()> {
        let mut temp_name = target.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, target)?;
        self.sync_directory()
    }

    /// Syncs the scope directory so created and renamed entries are durable.
    #[cfg(unix)]
    pub fn sync_directory(&self) -> CoreResult<()> {
        let dir = File::open(&self.path)?;
        dir.sync_all()?;
        Ok(())
    }

    /// Syncs the scope directory so created and renamed entries are durable.
    #[cfg(not(unix))]
    pub fn sync_directory(&self) -> CoreResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}
