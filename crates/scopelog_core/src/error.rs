//! Error types for scopelog core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in scopelog core operations.
///
/// "Nothing to read yet" and "scope not initialized" are not errors; those
/// surface as `false`, `None` or `0` from the engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A segment file could not be opened or created.
    #[error("cannot open segment {path}: {source}")]
    SegmentOpen {
        /// Path of the segment file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Segment is corrupted or invalid.
    #[error("segment corruption: {message}")]
    SegmentCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// The meta file exists but could not be parsed.
    #[error("invalid meta file {path}: {message}")]
    InvalidMeta {
        /// Path of the meta file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The index file exists but could not be parsed.
    #[error("invalid index file {path}: {message}")]
    InvalidIndex {
        /// Path of the index file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Another holder owns the byte range this scope needs.
    #[error("lock denied on {path} for bytes {start}..{end}")]
    LockDenied {
        /// Path of the locked segment file.
        path: PathBuf,
        /// First byte of the requested range.
        start: u64,
        /// End of the requested range (`u64::MAX` for "to end of file").
        end: u64,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the rejected value.
        message: String,
    },

    /// Scope identifier is empty or not a plain directory name.
    #[error("invalid scope id: {id:?}")]
    InvalidScopeId {
        /// The rejected identifier.
        id: String,
    },

    /// The scope already belongs to a backup context.
    #[error("scope {scope_id} already registered with context {context}")]
    ContextAlreadySet {
        /// Scope that was registered twice.
        scope_id: String,
        /// Context it already belongs to.
        context: String,
    },

    /// The scope was initialized before being registered with a context.
    #[error("scope {scope_id} is not registered with a backup context")]
    NotRegistered {
        /// Scope missing its context.
        scope_id: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The async write queue is at capacity.
    #[error("write queue full ({capacity} pending writes)")]
    WriteQueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The async write worker has stopped.
    #[error("write worker is shut down")]
    WorkerShutdown,
}

impl CoreError {
    /// Creates a segment corruption error.
    pub fn segment_corruption(message: impl Into<String>) -> Self {
        Self::SegmentCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a segment open error.
    pub fn segment_open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SegmentOpen {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors that leave the scope unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SegmentOpen { .. }
                | Self::SegmentCorruption { .. }
                | Self::InvalidMeta { .. }
                | Self::InvalidIndex { .. }
                | Self::LockDenied { .. }
        )
    }
}
