//! Backup contexts.
//!
//! A context is a named group of scopes. Scopes register into exactly one
//! context before they initialize; the context only tracks membership and
//! never touches scope files.

use crate::error::{CoreError, CoreResult};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const CONTEXT_ID_PREFIX: &str = "backup_context_";

/// Identity of a registered scope: scope id plus parent directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    /// Scope identifier.
    pub scope_id: String,
    /// Parent directory holding the scope directory.
    pub parent: PathBuf,
}

/// A named group of backup scopes.
#[derive(Debug)]
pub struct BackupContext {
    name: String,
    id: String,
    scopes: RwLock<HashSet<ScopeKey>>,
}

impl BackupContext {
    /// Creates a context with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `name` is empty.
    pub fn new(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::invalid_config("backup context name must not be empty"));
        }
        Ok(Self {
            name,
            id: format!("{CONTEXT_ID_PREFIX}{}", Uuid::new_v4()),
            scopes: RwLock::new(HashSet::new()),
        })
    }

    /// Context name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generated context id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds a scope. Returns false if it was already registered.
    pub(crate) fn register(&self, scope_id: &str, parent: &Path) -> bool {
        let key = ScopeKey {
            scope_id: scope_id.to_owned(),
            parent: parent.to_path_buf(),
        };
        let mut scopes = self.scopes.write();
        if scopes.contains(&key) {
            return false;
        }
        tracing::info!(
            scope = %scope_id,
            parent = %parent.display(),
            context = %self,
            "backup scope added to context"
        );
        scopes.insert(key);
        true
    }

    /// Returns true if the scope is registered here.
    #[must_use]
    pub fn contains(&self, scope_id: &str, parent: &Path) -> bool {
        self.scopes.read().contains(&ScopeKey {
            scope_id: scope_id.to_owned(),
            parent: parent.to_path_buf(),
        })
    }

    /// Number of registered scopes.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.read().len()
    }

    /// Registered scopes in no particular order.
    #[must_use]
    pub fn scopes(&self) -> Vec<ScopeKey> {
        self.scopes.read().iter().cloned().collect()
    }
}

impl fmt::Display for BackupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_rejected() {
        assert!(matches!(
            BackupContext::new(""),
            Err(CoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn generated_id_has_prefix() {
        let ctx = BackupContext::new("orders").unwrap();
        assert_eq!(ctx.name(), "orders");
        assert!(ctx.id().starts_with(CONTEXT_ID_PREFIX));
        assert_eq!(ctx.to_string(), format!("orders:{}", ctx.id()));
    }

    #[test]
    fn duplicate_registration_is_noop() {
        let ctx = BackupContext::new("orders").unwrap();
        let parent = Path::new("/tmp/scopes");

        assert!(ctx.register("a", parent));
        assert!(!ctx.register("a", parent));
        assert!(ctx.register("a", Path::new("/tmp/other")));
        assert!(ctx.register("b", parent));

        assert_eq!(ctx.scope_count(), 3);
        assert!(ctx.contains("b", parent));
        assert!(!ctx.contains("c", parent));
    }
}
