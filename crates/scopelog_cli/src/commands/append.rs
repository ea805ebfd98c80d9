//! Append command implementation.

use super::open_scope;
use scopelog_core::ScopeConfig;
use std::io::BufRead;
use std::path::Path;

/// Runs the append command.
///
/// Each argument becomes one record; with no arguments, each stdin line
/// does.
pub fn run(
    parent: &Path,
    scope_id: &str,
    max_segment_bytes: Option<u64>,
    records: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ScopeConfig::new();
    if let Some(bytes) = max_segment_bytes {
        config = config.max_segment_bytes(bytes)?;
    }
    let scope = open_scope(parent, scope_id, config)?;

    let mut count = 0usize;
    let mut bytes = 0usize;
    if records.is_empty() {
        for line in std::io::stdin().lock().lines() {
            bytes += append_one(&scope, line?.as_bytes())?;
            count += 1;
        }
    } else {
        for record in records {
            bytes += append_one(&scope, record.as_bytes())?;
            count += 1;
        }
    }

    scope.shutdown()?;
    tracing::info!(records = count, bytes, "append finished");
    println!("Appended {} records ({} bytes)", count, bytes);
    Ok(())
}

fn append_one(
    scope: &scopelog_core::BackupScope,
    payload: &[u8],
) -> Result<usize, Box<dyn std::error::Error>> {
    match scope.try_write(payload)? {
        0 => Err("write failed, see log for details".into()),
        written => Ok(written),
    }
}
