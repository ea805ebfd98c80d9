//! Dump command implementation.

use scopelog_core::{ScopeDir, SegmentFile};
use serde::Serialize;
use std::path::Path;

/// Frame representation for output.
#[derive(Debug, Serialize)]
pub struct FrameRecord {
    /// Offset of the length prefix within the segment.
    pub offset: u64,
    /// Payload length in bytes.
    pub length: u32,
    /// Payload as UTF-8 text, if it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Runs the dump command.
///
/// Reads the segment file directly; cursors and locks are left untouched.
pub fn run(
    parent: &Path,
    scope_id: &str,
    segment_index: u64,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = ScopeDir::new(parent, scope_id);
    let path = dir.segment_path(segment_index);
    if !path.is_file() {
        return Err(format!("Segment not found: {}", path.display()).into());
    }

    let segment = SegmentFile::open_for_read(&path)?;
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    for frame in segment.scan()?.into_iter().take(max_records) {
        let payload = segment.read_frame_at(frame.offset)?;
        records.push(FrameRecord {
            offset: frame.offset,
            length: frame.length,
            text: String::from_utf8(payload).ok(),
        });
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            println!(
                "Segment {} (capacity {} bytes)",
                segment_index,
                segment.capacity()
            );
            print_text_output(&records);
        }
    }

    Ok(())
}

fn print_text_output(records: &[FrameRecord]) {
    println!("{:>10}  {:>8}  PAYLOAD", "OFFSET", "LENGTH");
    for record in records {
        let text = record.text.as_deref().unwrap_or("<binary>");
        println!("{:>10}  {:>8}  {}", record.offset, record.length, text);
    }
    println!();
    println!("Total frames: {}", records.len());
}
