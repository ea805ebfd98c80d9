//! Read path.
//!
//! The reader consumes frames from `read_start` up to `read_end`, holding a
//! shared lock over exactly the bytes it may still read. It never waits for
//! data: with nothing between the read cursors it returns `None` and the
//! caller polls again later.

use super::{BackupScope, SideState};
use crate::error::{CoreError, CoreResult};
use crate::location::Location;
use crate::lock::{LockMode, LockRange, RangeLock};
use crate::meta::ScopeMeta;
use crate::segment::{SegmentFile, HEADER_BYTES, ITEM_HEADER_BYTES};
use std::cmp::Ordering;

impl BackupScope {
    /// Opens the segment at `read_start` for reading.
    ///
    /// Returns `Ok(false)` when the scope is not initialized or there is
    /// nothing to read yet; neither is an error.
    ///
    /// # Errors
    ///
    /// A missing segment or a denied lock marks the scope invalid and
    /// returns the error.
    pub fn open_read(&self) -> CoreResult<bool> {
        let Some(meta) = self.active_meta() else {
            return Ok(false);
        };
        let mut reader = self.reader.lock();
        self.open_read_locked(&mut reader, meta)
    }

    /// Consumes the next record, if one is available.
    ///
    /// Returns `Ok(None)` when there is nothing to read, the scope is not
    /// ready, or the frame could not be read (logged; cursor unchanged).
    ///
    /// # Errors
    ///
    /// Fails only when moving to the next segment or refreshing the read
    /// lock fails; those mark the scope invalid.
    pub fn try_read(&self) -> CoreResult<Option<Vec<u8>>> {
        let Some(meta) = self.active_meta() else {
            return Ok(None);
        };
        let mut guard = self.reader.lock();
        let reader = &mut *guard;
        if !reader.is_open() && !self.open_read_locked(reader, meta)? {
            return Ok(None);
        }

        // The writer may have rolled over after our last read consumed the
        // final frame of this segment.
        let start = meta.read_start();
        if start.offset() > reader.capacity
            && meta.read_end().segment_index() > start.segment_index()
        {
            self.rotate_read(reader, meta, start.segment_index())?;
            if !reader.is_open() {
                return Ok(None);
            }
        }

        let start = meta.read_start();
        let end = meta.read_end();
        if !Location::has_offset(&start, &end) {
            return Ok(None);
        }

        let Some(segment) = reader.segment.as_ref() else {
            return Ok(None);
        };
        let payload = match segment.read_frame_at(start.offset()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(scope = %self, at = %start, error = %e, "failed to read record");
                self.stats.record_error();
                return Ok(None);
            }
        };

        let frame_bytes = ITEM_HEADER_BYTES + payload.len() as u64;
        let next = start.offset() + frame_bytes;
        self.stats.record_read(frame_bytes);

        if next > reader.capacity && end.segment_index() > start.segment_index() {
            self.rotate_read(reader, meta, start.segment_index())?;
        } else {
            meta.set_read_start(Location::new(start.segment_index(), next));
            self.relock_read(reader, meta)?;
        }
        Ok(Some(payload))
    }

    /// Closes the read side: commits the cursors and releases the lock.
    /// A no-op when nothing is open.
    pub fn close_read(&self) -> CoreResult<()> {
        let mut reader = self.reader.lock();
        self.close_read_locked(&mut reader)
    }

    fn open_read_locked(&self, reader: &mut SideState, meta: &ScopeMeta) -> CoreResult<bool> {
        if reader.is_open() {
            return Ok(true);
        }

        let start = meta.read_start();
        if !Location::has_offset(&start, &meta.read_end()) {
            tracing::debug!(scope = %self, at = %start, "nothing to read");
            return Ok(false);
        }

        let path = self.dir.segment_path(start.segment_index());
        let segment = match SegmentFile::open_for_read(&path) {
            Ok(segment) => segment,
            Err(e) => return Err(self.invalidate(e)),
        };
        reader.capacity = segment.capacity();
        reader.segment = Some(segment);

        // Skip the capacity header. A cursor already past it is resuming.
        if start.offset() < HEADER_BYTES {
            meta.set_read_start(Location::new(start.segment_index(), HEADER_BYTES));
        }

        self.relock_read(reader, meta)?;
        tracing::info!(scope = %self, segment = start.segment_index(), "segment open for read");
        Ok(true)
    }

    fn rotate_read(&self, reader: &mut SideState, meta: &ScopeMeta, index: u64) -> CoreResult<()> {
        tracing::info!(
            scope = %self,
            segment = index,
            capacity = reader.capacity,
            "read segment exhausted, moving to next"
        );
        meta.set_read_start(Location::new(index + 1, 0));
        self.stats.record_read_rotation();

        if let Err(e) = self.close_read_locked(reader) {
            tracing::warn!(scope = %self, segment = index, error = %e, "failed to close read segment");
            self.stats.record_error();
        }
        self.open_read_locked(reader, meta).map(|_| ())
    }

    /// Replaces the shared lock with one covering the unread bytes.
    ///
    /// With `read_end` in the same segment the range is
    /// `[read_start, read_end]`; with `read_end` in a later segment the rest
    /// of this segment may still be read and the range is open-ended. An
    /// empty range holds no lock.
    fn relock_read(&self, reader: &mut SideState, meta: &ScopeMeta) -> CoreResult<()> {
        reader.lock = None;

        let Some(segment) = reader.segment.as_ref() else {
            return Err(CoreError::invalid_operation("read side is not open"));
        };
        let start = meta.read_start();
        let end = meta.read_end();
        let range = match end.segment_index().cmp(&start.segment_index()) {
            Ordering::Greater => Some(LockRange::to_end(start.offset())),
            Ordering::Equal => LockRange::span(start.offset(), end.offset()),
            Ordering::Less => None,
        };
        let Some(range) = range else {
            return Ok(());
        };

        match RangeLock::try_acquire(segment.handle(), range, LockMode::Shared) {
            Ok(Some(lock)) => {
                reader.lock = Some(lock);
                Ok(())
            }
            Ok(None) => Err(self.invalidate(CoreError::LockDenied {
                path: segment.path().to_path_buf(),
                start: range.start(),
                end: range.end().unwrap_or(u64::MAX),
            })),
            Err(e) => Err(self.invalidate(e.into())),
        }
    }

    pub(super) fn close_read_locked(&self, reader: &mut SideState) -> CoreResult<()> {
        let Some(segment) = reader.segment.take() else {
            tracing::debug!(scope = %self, "read side already closed");
            return Ok(());
        };
        let lock = reader.lock.take();

        drop(segment);
        let result = self.commit_meta();
        drop(lock);

        match &result {
            Ok(()) => tracing::info!(scope = %self, "read side closed"),
            Err(e) => tracing::error!(scope = %self, error = %e, "error while closing read side"),
        }
        result
    }
}
