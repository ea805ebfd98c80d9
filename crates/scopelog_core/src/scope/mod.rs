//! The backup scope engine.
//!
//! A [`BackupScope`] owns one scope directory and moves records through it:
//! writers append frames at the write cursor, a reader consumes frames
//! between the read cursors, and both sides roll over to the next segment
//! file once the current one has reached its declared capacity.
//!
//! ```rust,ignore
//! use scopelog_core::{BackupContext, ScopeBuilder, ScopeConfig};
//!
//! let ctx = BackupContext::new("orders")?;
//! let scope = ScopeBuilder::with_id("/var/lib/app", "pending_orders")?
//!     .context(&ctx)?
//!     .config(ScopeConfig::new().max_segment_bytes(1 << 20)?)?
//!     .build();
//!
//! scope.init()?;
//! scope.try_write(b"order-17")?;
//! while let Some(record) = scope.try_read()? {
//!     // ...
//! }
//! scope.shutdown()?;
//! ```
//!
//! # Thread Safety
//!
//! All operations take `&self`. The write side and the read side each have
//! their own mutex, and the cursor set has its own reader/writer lock, so a
//! producer and a consumer never wait on each other.

mod read;
mod state;
mod write;

pub use state::ScopeState;

use crate::config::ScopeConfig;
use crate::context::BackupContext;
use crate::dir::{generate_scope_id, validate_scope_id, ScopeDir};
use crate::error::{CoreError, CoreResult};
use crate::index::{IndexEntry, ScopeIndex};
use crate::lock::RangeLock;
use crate::meta::ScopeMeta;
use crate::segment::SegmentFile;
use crate::stats::ScopeStats;
use crate::worker::{PendingWrite, WriteWorker};
use parking_lot::Mutex;
use state::StateCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, OnceLock};

/// Open segment, its capacity and the byte-range lock held on it.
#[derive(Debug, Default)]
struct SideState {
    segment: Option<SegmentFile>,
    capacity: u64,
    lock: Option<RangeLock>,
}

impl SideState {
    fn is_open(&self) -> bool {
        self.segment.is_some()
    }
}

#[derive(Debug)]
struct WriteSide {
    side: SideState,
    /// Reusable frame buffer.
    scratch: Vec<u8>,
}

enum WorkerSlot {
    Idle,
    Running(WriteWorker),
    Stopped,
}

/// A segmented append log with persistent read and write cursors.
pub struct BackupScope {
    parent: PathBuf,
    scope_id: String,
    dir: ScopeDir,
    config: ScopeConfig,
    context: Option<String>,
    state: StateCell,
    meta: OnceLock<ScopeMeta>,
    index: OnceLock<ScopeIndex>,
    writer: Mutex<WriteSide>,
    reader: Mutex<SideState>,
    stats: ScopeStats,
    worker: Mutex<WorkerSlot>,
}

impl BackupScope {
    /// Creates a scope under `parent` with a generated `backup_scope_<uuid>` id.
    ///
    /// Nothing is created on disk until [`BackupScope::init`].
    pub fn new(parent: impl Into<PathBuf>) -> CoreResult<Self> {
        Self::with_id(parent, generate_scope_id())
    }

    /// Creates a scope with an explicit id.
    ///
    /// If `<parent>/<scope_id>` already exists, `init` reattaches to it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty parent path and `InvalidScopeId`
    /// for an id that is not a plain directory name.
    pub fn with_id(parent: impl Into<PathBuf>, scope_id: impl Into<String>) -> CoreResult<Self> {
        let parent = parent.into();
        let scope_id = scope_id.into();
        if parent.as_os_str().is_empty() {
            return Err(CoreError::invalid_config("scope parent path must not be empty"));
        }
        validate_scope_id(&scope_id)?;

        let config = ScopeConfig::default();
        Ok(Self {
            dir: ScopeDir::new(&parent, &scope_id),
            parent,
            scope_id,
            writer: Mutex::new(WriteSide {
                side: SideState::default(),
                scratch: Vec::with_capacity(buffer_capacity(&config)),
            }),
            config,
            context: None,
            state: StateCell::new(),
            meta: OnceLock::new(),
            index: OnceLock::new(),
            reader: Mutex::new(SideState::default()),
            stats: ScopeStats::new(),
            worker: Mutex::new(WorkerSlot::Idle),
        })
    }

    /// Replaces the configuration. Only allowed before `init`.
    pub fn set_config(&mut self, config: ScopeConfig) -> CoreResult<()> {
        let state = self.state.get();
        if state != ScopeState::Ready {
            return Err(CoreError::invalid_operation(format!(
                "cannot change configuration of scope {} in state {state}",
                self.scope_id
            )));
        }
        self.writer.get_mut().scratch = Vec::with_capacity(buffer_capacity(&config));
        self.config = config;
        Ok(())
    }

    /// Registers this scope with `context`.
    ///
    /// # Errors
    ///
    /// Returns `ContextAlreadySet` if the scope already belongs to a context.
    pub fn set_backup_context(&mut self, context: &BackupContext) -> CoreResult<()> {
        if let Some(existing) = &self.context {
            return Err(CoreError::ContextAlreadySet {
                scope_id: self.scope_id.clone(),
                context: existing.clone(),
            });
        }
        context.register(&self.scope_id, &self.parent);
        self.context = Some(context.to_string());
        Ok(())
    }

    /// Creates or reattaches the scope directory and loads meta and index.
    ///
    /// Runs once; later calls return `Ok(())` without doing anything.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered` (state unchanged) if no context was set.
    /// Any I/O or parse failure marks the scope invalid and is returned.
    pub fn init(&self) -> CoreResult<()> {
        if self.context.is_none() {
            return Err(CoreError::NotRegistered {
                scope_id: self.scope_id.clone(),
            });
        }
        if !self.state.transition(ScopeState::Ready, ScopeState::InInit) {
            tracing::debug!(scope = %self, state = %self.state.get(), "init skipped");
            return Ok(());
        }

        if let Err(e) = self.load() {
            return Err(self.invalidate(e));
        }

        if self.state.transition(ScopeState::InInit, ScopeState::Init) {
            tracing::info!(scope = %self, "backup scope initialized");
        }
        Ok(())
    }

    fn load(&self) -> CoreResult<()> {
        self.dir.create_or_reuse()?;
        let meta = ScopeMeta::load(&self.dir)?;
        let index = ScopeIndex::load(&self.dir)?;
        // `init` runs at most once, so both cells are still empty.
        let _ = self.meta.set(meta);
        let _ = self.index.set(index);
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScopeState {
        self.state.get()
    }

    /// Returns false once the scope has hit an unrecoverable error.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.get() != ScopeState::Invalid
    }

    /// Scope identifier.
    #[must_use]
    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    /// Parent directory.
    #[must_use]
    pub fn parent(&self) -> &Path {
        &self.parent
    }

    /// The scope directory, `<parent>/<scope_id>`.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Display form of the owning context, if registered.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Cursor set; `None` before `init` has loaded it.
    #[must_use]
    pub fn meta(&self) -> Option<&ScopeMeta> {
        self.meta.get()
    }

    /// Point index; `None` before `init` has loaded it.
    #[must_use]
    pub fn index(&self) -> Option<&ScopeIndex> {
        self.index.get()
    }

    /// Looks up `key` in the point index.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<IndexEntry> {
        self.index.get().and_then(|index| index.lookup(key))
    }

    /// Operation counters.
    #[must_use]
    pub fn stats(&self) -> &ScopeStats {
        &self.stats
    }

    /// Returns true while a segment is open for writing.
    #[must_use]
    pub fn is_write_open(&self) -> bool {
        self.writer.lock().side.is_open()
    }

    /// Returns true while a segment is open for reading.
    #[must_use]
    pub fn is_read_open(&self) -> bool {
        self.reader.lock().is_open()
    }

    /// Queues `payload` for the scope's write worker.
    ///
    /// The worker thread is started on first use. Writes run one at a time in
    /// submission order, each exactly as [`BackupScope::try_write`].
    ///
    /// # Errors
    ///
    /// Returns `WriteQueueFull` if the queue is at capacity and
    /// `WorkerShutdown` after [`BackupScope::shutdown`].
    pub fn write_async(self: &Arc<Self>, payload: Vec<u8>) -> CoreResult<PendingWrite> {
        let mut slot = self.worker.lock();
        if matches!(*slot, WorkerSlot::Idle) {
            let worker = WriteWorker::spawn(
                format!("scopelog-write-{}", self.scope_id),
                self.config.queue_capacity(),
            )?;
            *slot = WorkerSlot::Running(worker);
        }
        let WorkerSlot::Running(worker) = &*slot else {
            return Err(CoreError::WorkerShutdown);
        };

        let (tx, rx) = mpsc::sync_channel(1);
        let scope = Arc::clone(self);
        worker.submit(Box::new(move || {
            let _ = tx.send(scope.try_write(&payload));
        }))?;
        Ok(PendingWrite::new(rx))
    }

    /// Stops the write worker, then closes both sides.
    ///
    /// Queued writes get up to the configured shutdown timeout to finish.
    /// After shutdown `write_async` fails; synchronous reads and writes keep
    /// working and reopen their segments on demand.
    pub fn shutdown(&self) -> CoreResult<()> {
        let slot = std::mem::replace(&mut *self.worker.lock(), WorkerSlot::Stopped);
        if let WorkerSlot::Running(mut worker) = slot {
            if !worker.shutdown(self.config.shutdown_timeout()) {
                tracing::warn!(scope = %self, "pending async writes abandoned at shutdown");
            }
        }

        let write = self.close_write();
        let read = self.close_read();
        write.and(read)
    }

    /// Marks the scope invalid and hands the error back for returning.
    fn invalidate(&self, error: CoreError) -> CoreError {
        let previous = self.state.invalidate();
        if previous != ScopeState::Invalid {
            tracing::error!(scope = %self, %error, from = %previous, "backup scope invalidated");
        }
        self.stats.record_error();
        error
    }

    /// Persists the cursor set if it is loaded and dirty.
    fn commit_meta(&self) -> CoreResult<()> {
        match self.meta.get() {
            Some(meta) => meta.commit().map(|_| ()),
            None => Ok(()),
        }
    }

    /// The cursor set, if reads and writes are currently allowed.
    fn active_meta(&self) -> Option<&ScopeMeta> {
        if self.state.get() != ScopeState::Init {
            return None;
        }
        self.meta.get()
    }
}

fn buffer_capacity(config: &ScopeConfig) -> usize {
    usize::try_from(config.buffer_hint()).unwrap_or(usize::MAX)
}

impl fmt::Display for BackupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.scope_id, self.parent.display())
    }
}

impl fmt::Debug for BackupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupScope")
            .field("parent", &self.parent)
            .field("scope_id", &self.scope_id)
            .field("state", &self.state.get())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Drop for BackupScope {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(scope = %self, error = %e, "error while closing backup scope");
        }
    }
}
