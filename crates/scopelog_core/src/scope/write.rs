//! Write path.
//!
//! Frames are written at `write_start`. After each write the write cursor
//! advances, the exclusive lock is moved to the new tail and `read_end` is
//! published so a reader can see the frame. A frame that ends past the
//! segment capacity closes the segment; the next segment is created
//! immediately.

use super::{BackupScope, WriteSide};
use crate::error::{CoreError, CoreResult};
use crate::location::Location;
use crate::lock::{LockMode, LockRange, RangeLock};
use crate::meta::ScopeMeta;
use crate::segment::{encode_frame, SegmentFile, HEADER_BYTES};

impl BackupScope {
    /// Opens the segment at `write_start` for writing.
    ///
    /// Returns `Ok(false)` if the scope is not initialized (or invalid), and
    /// `Ok(true)` if the write side is open, including when it already was.
    ///
    /// # Errors
    ///
    /// Failing to open the segment or to lock its tail marks the scope
    /// invalid and returns the error.
    pub fn open_write(&self) -> CoreResult<bool> {
        let Some(meta) = self.active_meta() else {
            return Ok(false);
        };
        let mut writer = self.writer.lock();
        self.open_write_locked(&mut writer, meta)?;
        Ok(true)
    }

    /// Appends one record.
    ///
    /// Opens the write side if needed. Returns the number of bytes written,
    /// frame prefix included, or `0` if the scope is not ready or the write
    /// itself failed (logged; cursors unchanged).
    ///
    /// # Errors
    ///
    /// Returns an error if a rollover or lock refresh after the write fails;
    /// those mark the scope invalid.
    pub fn try_write(&self, payload: &[u8]) -> CoreResult<usize> {
        let Some(meta) = self.active_meta() else {
            return Ok(0);
        };
        let mut guard = self.writer.lock();
        let writer = &mut *guard;
        if !writer.side.is_open() {
            self.open_write_locked(writer, meta)?;
        }

        encode_frame(payload, &mut writer.scratch)?;
        let at = meta.write_start();
        let Some(segment) = writer.side.segment.as_ref() else {
            return Ok(0);
        };
        if let Err(e) = segment.write_at(at.offset(), &writer.scratch) {
            tracing::error!(scope = %self, at = %at, error = %e, "failed to write record");
            self.stats.record_error();
            return Ok(0);
        }

        let count = writer.scratch.len() as u64;
        let hint = writer.scratch.capacity().min(super::buffer_capacity(&self.config));
        writer.scratch.shrink_to(hint);
        self.stats.record_write(count);

        self.advance_write(writer, meta, at, count)?;
        Ok(to_usize(count))
    }

    /// Closes the write side: syncs the segment, commits the cursors and
    /// releases the lock. A no-op when nothing is open.
    pub fn close_write(&self) -> CoreResult<()> {
        let mut writer = self.writer.lock();
        self.close_write_locked(&mut writer)
    }

    pub(super) fn open_write_locked(
        &self,
        writer: &mut WriteSide,
        meta: &ScopeMeta,
    ) -> CoreResult<()> {
        if writer.side.is_open() {
            return Ok(());
        }

        let at = meta.write_start();
        let path = self.dir.segment_path(at.segment_index());
        let (segment, created) =
            match SegmentFile::open_for_write(&path, self.config.segment_capacity()) {
                Ok(opened) => opened,
                Err(e) => return Err(self.invalidate(e)),
            };
        writer.side.capacity = segment.capacity();
        writer.side.segment = Some(segment);
        tracing::info!(scope = %self, segment = at.segment_index(), "segment open for write");

        if created {
            // Account for the capacity header like any other write.
            let header_at = Location::new(at.segment_index(), 0);
            self.advance_write(writer, meta, header_at, HEADER_BYTES)
        } else {
            // A rollover is committed before the header advance is, so a
            // restart can resume with the cursor still inside the header.
            if at.offset() < HEADER_BYTES {
                tracing::info!(scope = %self, at = %at, "resuming write past segment header");
                meta.set_write_start(Location::new(at.segment_index(), HEADER_BYTES));
            }
            self.relock_write(writer, meta)
        }
    }

    /// Moves the cursors past `count` bytes written at `at`.
    fn advance_write(
        &self,
        writer: &mut WriteSide,
        meta: &ScopeMeta,
        at: Location,
        count: u64,
    ) -> CoreResult<()> {
        let index = at.segment_index();
        let end = at.offset() + count;

        if end > writer.side.capacity {
            // Publish the frame before the close commits the cursors.
            meta.set_read_end(Location::new(index, end - 1));
            meta.set_write_start(Location::new(index + 1, 0));
            self.stats.record_write_rotation();
            tracing::info!(
                scope = %self,
                segment = index,
                end,
                capacity = writer.side.capacity,
                "write segment full, rolling over"
            );
            if let Err(e) = self.close_write_locked(writer) {
                tracing::warn!(scope = %self, segment = index, error = %e, "failed to close full segment");
                self.stats.record_error();
            }
            self.open_write_locked(writer, meta)?;
        } else {
            meta.set_write_start(Location::new(index, end));
            self.relock_write(writer, meta)?;
        }

        meta.set_read_end(Location::new(index, end - 1));
        Ok(())
    }

    /// Replaces the exclusive lock with one on `[write_start, EOF)`.
    fn relock_write(&self, writer: &mut WriteSide, meta: &ScopeMeta) -> CoreResult<()> {
        // Release first: both ranges live on the same open file, and
        // unlocking the old range afterwards would also unlock the new one.
        writer.side.lock = None;

        let Some(segment) = writer.side.segment.as_ref() else {
            return Err(CoreError::invalid_operation("write side is not open"));
        };
        let start = meta.write_start().offset();
        match RangeLock::try_acquire(segment.handle(), LockRange::to_end(start), LockMode::Exclusive)
        {
            Ok(Some(lock)) => {
                writer.side.lock = Some(lock);
                Ok(())
            }
            Ok(None) => Err(self.invalidate(CoreError::LockDenied {
                path: segment.path().to_path_buf(),
                start,
                end: u64::MAX,
            })),
            Err(e) => Err(self.invalidate(e.into())),
        }
    }

    pub(super) fn close_write_locked(&self, writer: &mut WriteSide) -> CoreResult<()> {
        let Some(segment) = writer.side.segment.take() else {
            tracing::debug!(scope = %self, "write side already closed");
            return Ok(());
        };
        let lock = writer.side.lock.take();

        let synced = segment.sync().map_err(CoreError::from);
        drop(segment);
        let committed = self.commit_meta();
        drop(lock);
        let result = synced.and(committed);

        match &result {
            Ok(()) => tracing::info!(scope = %self, "write side closed"),
            Err(e) => {
                tracing::error!(scope = %self, error = %e, "error while closing write side");
            }
        }
        result
    }
}

fn to_usize(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}
