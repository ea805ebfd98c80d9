//! Test fixtures and scope helpers.
//!
//! Provides convenience functions for setting up initialized scopes in
//! temporary directories.

use scopelog_core::{BackupContext, BackupScope, ScopeBuilder, ScopeConfig};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Name of the context every fixture scope registers with.
pub const TEST_CONTEXT: &str = "testkit";

/// An initialized scope with automatic cleanup.
pub struct TestScope {
    /// The scope instance.
    pub scope: Arc<BackupScope>,
    /// The context the scope is registered with.
    pub context: BackupContext,
    /// The temporary parent directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestScope {
    /// Creates an initialized scope with default configuration.
    pub fn new() -> Self {
        Self::with_config(ScopeConfig::default())
    }

    /// Creates an initialized scope with `config`.
    pub fn with_config(config: ScopeConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let context = BackupContext::new(TEST_CONTEXT).expect("Failed to create context");
        let scope = open_scope(temp_dir.path(), "test_scope", &context, config);
        Self {
            scope: Arc::new(scope),
            context,
            temp_dir,
        }
    }

    /// Creates a scope whose segments hold at most `max_segment_bytes`.
    pub fn with_segment_bytes(max_segment_bytes: u64) -> Self {
        let config = ScopeConfig::new()
            .max_segment_bytes(max_segment_bytes)
            .expect("Invalid segment size");
        Self::with_config(config)
    }

    /// Parent directory of the scope.
    pub fn parent(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Shuts the scope down and opens a second instance on the same
    /// directory, as a restarted process would.
    ///
    /// Panics if another handle to the scope is still alive.
    pub fn reopen(self) -> Self {
        let Self {
            scope,
            context,
            temp_dir,
        } = self;
        let config = scope.config().clone();
        let scope_id = scope.scope_id().to_owned();
        scope.shutdown().expect("Failed to shut down scope");
        drop(Arc::into_inner(scope).expect("Scope still shared"));

        let context = BackupContext::new(context.name()).expect("Failed to create context");
        let scope = open_scope(temp_dir.path(), &scope_id, &context, config);
        Self {
            scope: Arc::new(scope),
            context,
            temp_dir,
        }
    }
}

impl Default for TestScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestScope {
    type Target = Arc<BackupScope>;

    fn deref(&self) -> &Self::Target {
        &self.scope
    }
}

/// Builds, registers and initializes a scope at `<parent>/<scope_id>`.
pub fn open_scope(
    parent: &Path,
    scope_id: &str,
    context: &BackupContext,
    config: ScopeConfig,
) -> BackupScope {
    let scope = ScopeBuilder::with_id(parent, scope_id)
        .expect("Invalid scope identity")
        .context(context)
        .expect("Failed to register scope")
        .config(config)
        .expect("Failed to configure scope")
        .build();
    scope.init().expect("Failed to initialize scope");
    scope
}

/// Runs a test with a temporary scope.
///
/// # Example
///
/// ```rust,ignore
/// use scopelog_testkit::with_temp_scope;
///
/// #[test]
/// fn my_test() {
///     with_temp_scope(|scope| {
///         scope.try_write(b"x").unwrap();
///     });
/// }
/// ```
pub fn with_temp_scope<F, R>(f: F) -> R
where
    F: FnOnce(&BackupScope) -> R,
{
    let test_scope = TestScope::new();
    f(&test_scope.scope)
}

/// Writes every record synchronously, asserting each write succeeded.
pub fn write_all<I, P>(scope: &BackupScope, records: I) -> usize
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut total = 0;
    for record in records {
        let written = scope.try_write(record.as_ref()).expect("Write failed");
        assert!(written > 0, "write reported no bytes");
        total += written;
    }
    total
}

/// Reads until the scope reports nothing left.
pub fn drain(scope: &BackupScope) -> Vec<Vec<u8>> {
    let mut records = Vec::new();
    while let Some(record) = scope.try_read().expect("Read failed") {
        records.push(record);
    }
    records
}

/// Pre-built test scenarios.
pub mod scenarios {
    use super::*;

    /// A scope holding `count` numbered records, none consumed yet.
    pub fn populated_scope(count: usize) -> TestScope {
        let test_scope = TestScope::new();
        write_all(&test_scope.scope, numbered_records(count));
        test_scope
    }

    /// Records `"record-0"`, `"record-1"`, ...
    pub fn numbered_records(count: usize) -> Vec<Vec<u8>> {
        (0..count)
            .map(|i| format!("record-{i}").into_bytes())
            .collect()
    }
}
