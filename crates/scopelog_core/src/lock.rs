//! Advisory byte-range locks on segment files.
//!
//! Locks are `fcntl` record locks. On Linux they are open-file-description
//! locks (`F_OFD_SETLK`), which belong to the open file rather than the
//! process, so two scope instances inside one process exclude each other the
//! same way two processes do. Other Unix targets fall back to classic
//! process-scoped `F_SETLK` locks.
//!
//! A [`RangeLock`] is a guard: dropping it releases the range, on every
//! path including early returns and unwinding.

use std::fmt;
use std::fs::File;
use std::io;
use std::sync::Arc;

/// Lock flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Read lock; compatible with other shared locks.
    Shared,
    /// Write lock; conflicts with every other lock on the range.
    Exclusive,
}

/// A byte range, either bounded (inclusive end) or open to end of file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRange {
    start: u64,
    end: Option<u64>,
}

impl LockRange {
    /// Range from `start` to end of file and beyond.
    #[must_use]
    pub const fn to_end(start: u64) -> Self {
        Self { start, end: None }
    }

    /// Range `[start, end]`, or `None` if it would be empty.
    #[must_use]
    pub const fn span(start: u64, end: u64) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self {
            start,
            end: Some(end),
        })
    }

    /// First locked byte.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Last locked byte, `None` when unbounded.
    #[must_use]
    pub const fn end(&self) -> Option<u64> {
        self.end
    }

    /// Length in `fcntl` terms, where zero means "to end of file".
    const fn fcntl_len(&self) -> u64 {
        match self.end {
            Some(end) => end - self.start + 1,
            None => 0,
        }
    }
}

impl fmt::Display for LockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}..={}", self.start, end),
            None => write!(f, "{}..", self.start),
        }
    }
}

/// A held byte-range lock, released on drop.
pub struct RangeLock {
    file: Arc<File>,
    range: LockRange,
    mode: LockMode,
}

impl RangeLock {
    /// Tries to lock `range` of `file` without blocking.
    ///
    /// Returns `Ok(None)` if a conflicting lock is held elsewhere.
    pub fn try_acquire(
        file: &Arc<File>,
        range: LockRange,
        mode: LockMode,
    ) -> io::Result<Option<Self>> {
        if !sys::try_lock(file, range.start, range.fcntl_len(), mode)? {
            return Ok(None);
        }
        Ok(Some(Self {
            file: Arc::clone(file),
            range,
            mode,
        }))
    }

    /// The locked range.
    #[must_use]
    pub fn range(&self) -> LockRange {
        self.range
    }

    /// The lock mode.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for RangeLock {
    fn drop(&mut self) {
        if let Err(e) = sys::unlock(&self.file, self.range.start, self.range.fcntl_len()) {
            tracing::warn!(range = %self.range, error = %e, "failed to release segment lock");
        }
    }
}

impl fmt::Debug for RangeLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeLock")
            .field("range", &self.range)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
mod sys {
    use super::LockMode;
    use nix::errno::Errno;
    use nix::fcntl::{fcntl, FcntlArg};
    use std::fs::File;
    use std::io;
    use std::os::fd::AsRawFd;

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn flock(lock_type: libc::c_short, start: u64, len: u64) -> libc::flock {
        libc::flock {
            l_type: lock_type,
            l_whence: libc::SEEK_SET as libc::c_short,
            l_start: start as libc::off_t,
            l_len: len as libc::off_t,
            // Must be zero for open file description locks.
            l_pid: 0,
        }
    }

    fn set_lock(file: &File, request: &libc::flock) -> io::Result<bool> {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        let arg = FcntlArg::F_OFD_SETLK(request);
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        let arg = FcntlArg::F_SETLK(request);

        match fcntl(file.as_raw_fd(), arg) {
            Ok(_) => Ok(true),
            Err(Errno::EACCES | Errno::EAGAIN) => Ok(false),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    pub(super) fn try_lock(file: &File, start: u64, len: u64, mode: LockMode) -> io::Result<bool> {
        // The constants are c_int on some targets and c_short on others.
        #[allow(clippy::unnecessary_cast, clippy::cast_possible_truncation)]
        let lock_type = match mode {
            LockMode::Shared => libc::F_RDLCK as libc::c_short,
            LockMode::Exclusive => libc::F_WRLCK as libc::c_short,
        };
        set_lock(file, &flock(lock_type, start, len))
    }

    pub(super) fn unlock(file: &File, start: u64, len: u64) -> io::Result<()> {
        #[allow(clippy::unnecessary_cast, clippy::cast_possible_truncation)]
        let unlock = flock(libc::F_UNLCK as libc::c_short, start, len);
        set_lock(file, &unlock).map(|_| ())
    }
}

#[cfg(not(unix))]
mod sys {
    use super::LockMode;
    use std::fs::File;
    use std::io;

    // No byte-range advisory locks; scopes rely on in-process serialization.
    pub(super) fn try_lock(_: &File, _: u64, _: u64, _: LockMode) -> io::Result<bool> {
        Ok(true)
    }

    pub(super) fn unlock(_: &File, _: u64, _: u64) -> io::Result<()> {
        Ok(())
    }
}
