//! Drain command implementation.

use super::open_scope;
use scopelog_core::ScopeConfig;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Delay between polls while following an idle scope.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runs the drain command.
///
/// Consumed records are removed from the scope's unread range; the read
/// cursor is committed on exit.
pub fn run(
    parent: &Path,
    scope_id: &str,
    limit: Option<usize>,
    follow: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let scope = open_scope(parent, scope_id, ScopeConfig::new())?;
    let max_records = limit.unwrap_or(usize::MAX);
    let mut count = 0usize;

    while count < max_records {
        match scope.try_read()? {
            Some(payload) => {
                println!("{}", String::from_utf8_lossy(&payload));
                count += 1;
            }
            None if !scope.is_valid() => {
                return Err(format!("scope {} is no longer valid", scope.scope_id()).into());
            }
            None if follow => thread::sleep(POLL_INTERVAL),
            None => break,
        }
    }

    scope.shutdown()?;
    tracing::info!(records = count, "drain finished");
    Ok(())
}
