//! Scope statistics.
//!
//! Counters are updated by the read and write paths and can be read while
//! operations are in progress.
//!
//! ```rust,ignore
//! let snap = scope.stats().snapshot();
//! println!("records written: {}", snap.records_written);
//! println!("write rotations: {}", snap.write_rotations);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters of one scope. Values only grow.
#[derive(Debug, Default)]
pub struct ScopeStats {
    records_written: AtomicU64,
    bytes_written: AtomicU64,
    records_read: AtomicU64,
    bytes_read: AtomicU64,
    write_rotations: AtomicU64,
    read_rotations: AtomicU64,
    errors: AtomicU64,
}

impl ScopeStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a written frame of `bytes` bytes (prefix included).
    pub(crate) fn record_write(&self, bytes: u64) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a consumed frame of `bytes` bytes (prefix included).
    pub(crate) fn record_read(&self, bytes: u64) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_write_rotation(&self) {
        self.write_rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_rotation(&self) {
        self.read_rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an error that was logged and swallowed.
    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of frames written.
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Returns the number of frames consumed.
    pub fn records_read(&self) -> u64 {
        self.records_read.load(Ordering::Relaxed)
    }

    /// Returns the number of swallowed errors.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records_written: self.records_written(),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            records_read: self.records_read(),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            write_rotations: self.write_rotations.load(Ordering::Relaxed),
            read_rotations: self.read_rotations.load(Ordering::Relaxed),
            errors: self.errors(),
        }
    }
}

/// A point-in-time copy of [`ScopeStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Frames written.
    pub records_written: u64,
    /// Bytes written, frame prefixes included.
    pub bytes_written: u64,
    /// Frames consumed by `try_read`.
    pub records_read: u64,
    /// Bytes consumed, frame prefixes included.
    pub bytes_read: u64,
    /// Segment rollovers on the write side.
    pub write_rotations: u64,
    /// Segment rollovers on the read side.
    pub read_rotations: u64,
    /// Errors logged and swallowed by the read/write paths.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        assert_eq!(ScopeStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_operations() {
        let stats = ScopeStats::new();

        stats.record_write(20);
        stats.record_write(30);
        stats.record_read(20);
        stats.record_write_rotation();

        let snap = stats.snapshot();
        assert_eq!(snap.records_written, 2);
        assert_eq!(snap.bytes_written, 50);
        assert_eq!(snap.records_read, 1);
        assert_eq!(snap.bytes_read, 20);
        assert_eq!(snap.write_rotations, 1);
        assert_eq!(snap.read_rotations, 0);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(ScopeStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_write(1);
                        s.record_error();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.records_written(), 800);
        assert_eq!(stats.errors(), 800);
    }
}
