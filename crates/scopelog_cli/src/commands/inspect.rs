//! Inspect command implementation.

use scopelog_core::{IndexEntry, MetaInfo, ScopeDir, SegmentFile};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Scope inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Scope directory.
    pub path: String,
    /// Persisted cursors, if the meta file exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursors: Option<MetaInfo>,
    /// Number of index entries.
    pub index_entries: usize,
    /// Per-segment details.
    pub segments: Vec<SegmentStats>,
    /// Total size of all segment files in bytes.
    pub total_size: u64,
}

/// Statistics for a single segment file.
#[derive(Debug, Serialize)]
pub struct SegmentStats {
    /// Segment index.
    pub index: u64,
    /// Declared capacity from the segment header.
    pub capacity: u64,
    /// File size in bytes.
    pub size: u64,
    /// Number of complete frames.
    pub frames: usize,
}

/// Runs the inspect command. Never creates or modifies files.
pub fn run(parent: &Path, scope_id: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dir = ScopeDir::new(parent, scope_id);
    if !dir.exists() {
        return Err(format!("No scope found at {}", dir.path().display()).into());
    }

    let meta_path = dir.meta_path();
    let cursors = if meta_path.is_file() {
        Some(MetaInfo::read_from(&meta_path)?)
    } else {
        None
    };

    let index_path = dir.index_path();
    let index_entries = if index_path.is_file() {
        let data = std::fs::read(&index_path)?;
        serde_json::from_slice::<HashMap<String, IndexEntry>>(&data)?.len()
    } else {
        0
    };

    let mut segments = Vec::new();
    for index in dir.segment_indices()? {
        let segment = SegmentFile::open_for_read(&dir.segment_path(index))?;
        segments.push(SegmentStats {
            index,
            capacity: segment.capacity(),
            size: segment.len()?,
            frames: segment.scan()?.len(),
        });
    }

    let result = InspectResult {
        path: dir.path().display().to_string(),
        cursors,
        index_entries,
        total_size: segments.iter().map(|s| s.size).sum(),
        segments,
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Backup Scope Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Cursors:");
    match &result.cursors {
        Some(cursors) => {
            println!("  Read start:  {}", cursors.read_start);
            println!("  Read end:    {}", cursors.read_end);
            println!("  Write start: {}", cursors.write_start);
        }
        None => println!("  (no meta file)"),
    }
    println!();
    println!("Index entries: {}", result.index_entries);
    println!();
    println!("Segments:");
    for segment in &result.segments {
        println!(
            "  [{}] {} frames, {} / {} bytes",
            segment.index,
            segment.frames,
            format_size(segment.size),
            format_size(segment.capacity)
        );
    }
    println!("  Total size: {}", format_size(result.total_size));
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
