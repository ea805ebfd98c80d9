//! CLI command implementations.

pub mod append;
pub mod drain;
pub mod dump;
pub mod inspect;

use scopelog_core::{BackupContext, BackupScope, ScopeBuilder, ScopeConfig};
use std::path::Path;

/// Opens an existing or new scope registered with a CLI context.
pub(crate) fn open_scope(
    parent: &Path,
    scope_id: &str,
    config: ScopeConfig,
) -> Result<BackupScope, Box<dyn std::error::Error>> {
    let ctx = BackupContext::new("scopelog-cli")?;
    let scope = ScopeBuilder::with_id(parent, scope_id)?
        .context(&ctx)?
        .config(config)?
        .build();
    scope.init()?;
    Ok(scope)
}
