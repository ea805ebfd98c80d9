//! Scope configuration.

use crate::error::{CoreError, CoreResult};
use crate::segment::HEADER_BYTES;
use std::time::Duration;

/// Configuration for a backup scope.
///
/// Set before [`crate::BackupScope::init`]; the scope rejects replacement
/// afterwards. Every setter rejects zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Declared capacity of each new segment file, header included.
    max_segment_bytes: u64,

    /// Capacity of the reusable frame buffer used by the write path.
    content_buffer_bytes: u64,

    /// How long shutdown waits for queued async writes to drain.
    worker_shutdown_timeout: Duration,

    /// Maximum number of pending async writes.
    write_queue_capacity: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            max_segment_bytes: 5 * 1024 * 1024,              // 5 MiB
            content_buffer_bytes: 100 * 1024,                // 100 KiB
            worker_shutdown_timeout: Duration::from_secs(10),
            write_queue_capacity: 1024,
        }
    }
}

impl ScopeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the declared capacity of new segment files.
    ///
    /// The value must leave room for the 8-byte capacity header.
    pub fn max_segment_bytes(mut self, bytes: u64) -> CoreResult<Self> {
        if bytes == 0 {
            return Err(CoreError::invalid_config("max segment size must be positive"));
        }
        if bytes <= HEADER_BYTES {
            return Err(CoreError::invalid_config(format!(
                "max segment size {bytes} does not exceed the {HEADER_BYTES}-byte header"
            )));
        }
        self.max_segment_bytes = bytes;
        Ok(self)
    }

    /// Sets the frame buffer size hint.
    pub fn content_buffer_bytes(mut self, bytes: u64) -> CoreResult<Self> {
        if bytes == 0 {
            return Err(CoreError::invalid_config("content buffer size must be positive"));
        }
        self.content_buffer_bytes = bytes;
        Ok(self)
    }

    /// Sets the write worker shutdown timeout in seconds.
    pub fn worker_shutdown_timeout_secs(mut self, secs: u64) -> CoreResult<Self> {
        if secs == 0 {
            return Err(CoreError::invalid_config("shutdown timeout must be positive"));
        }
        self.worker_shutdown_timeout = Duration::from_secs(secs);
        Ok(self)
    }

    /// Sets the maximum number of queued async writes.
    pub fn write_queue_capacity(mut self, capacity: usize) -> CoreResult<Self> {
        if capacity == 0 {
            return Err(CoreError::invalid_config("write queue capacity must be positive"));
        }
        self.write_queue_capacity = capacity;
        Ok(self)
    }

    /// Declared capacity of new segment files.
    #[must_use]
    pub const fn segment_capacity(&self) -> u64 {
        self.max_segment_bytes
    }

    /// Frame buffer size hint in bytes.
    #[must_use]
    pub const fn buffer_hint(&self) -> u64 {
        self.content_buffer_bytes
    }

    /// Write worker shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.worker_shutdown_timeout
    }

    /// Maximum number of queued async writes.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.write_queue_capacity
    }
}
