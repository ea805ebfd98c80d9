//! Fluent construction of backup scopes.

use crate::config::ScopeConfig;
use crate::context::BackupContext;
use crate::error::CoreResult;
use crate::scope::BackupScope;
use std::path::PathBuf;

/// Builds a [`BackupScope`] ready for `init`.
///
/// ```rust,ignore
/// let ctx = BackupContext::new("events")?;
/// let scope = ScopeBuilder::create("/var/lib/app")?
///     .context(&ctx)?
///     .build();
/// scope.init()?;
/// ```
#[derive(Debug)]
#[must_use]
pub struct ScopeBuilder {
    scope: BackupScope,
}

impl ScopeBuilder {
    /// Starts a scope with a generated id under `parent`.
    pub fn create(parent: impl Into<PathBuf>) -> CoreResult<Self> {
        Ok(Self {
            scope: BackupScope::new(parent)?,
        })
    }

    /// Starts a scope with an explicit id, reattaching if it exists on disk.
    pub fn with_id(parent: impl Into<PathBuf>, scope_id: impl Into<String>) -> CoreResult<Self> {
        Ok(Self {
            scope: BackupScope::with_id(parent, scope_id)?,
        })
    }

    /// Registers the scope with `context`.
    pub fn context(mut self, context: &BackupContext) -> CoreResult<Self> {
        self.scope.set_backup_context(context)?;
        Ok(self)
    }

    /// Sets the scope configuration.
    pub fn config(mut self, config: ScopeConfig) -> CoreResult<Self> {
        self.scope.set_config(config)?;
        Ok(self)
    }

    /// Returns the configured scope.
    pub fn build(self) -> BackupScope {
        self.scope
    }
}
