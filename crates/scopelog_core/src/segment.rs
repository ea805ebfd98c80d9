//! Segment files and record framing.
//!
//! ## Segment Format
//!
//! ```text
//! | capacity (8, BE) | len (4, BE) | payload (len) | len (4, BE) | payload | ...
//! ```
//!
//! The capacity header is written once when the segment is created and is
//! never rewritten. All offsets, including the capacity check, count the
//! header bytes. There is no end marker: how much of a segment holds valid
//! frames is tracked by the scope cursors.

use crate::error::{CoreError, CoreResult};
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Size of the per-segment capacity header.
pub const HEADER_BYTES: u64 = 8;

/// Size of the per-record length prefix.
pub const ITEM_HEADER_BYTES: u64 = 4;

/// Encodes `payload` as a frame into `buf`, replacing its contents.
///
/// # Errors
///
/// Returns an error if the payload length does not fit the 4-byte prefix.
pub fn encode_frame(payload: &[u8], buf: &mut Vec<u8>) -> CoreResult<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| CoreError::invalid_operation("record payload too large for frame"))?;
    buf.clear();
    buf.reserve(ITEM_HEADER_BYTES as usize + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(())
}

/// Position and size of one frame found by [`SegmentFile::scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Offset of the length prefix.
    pub offset: u64,
    /// Payload length.
    pub length: u32,
}

impl FrameInfo {
    /// Offset just past the payload.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + ITEM_HEADER_BYTES + self.length as u64
    }
}

/// An open segment file with its capacity header already read.
#[derive(Debug)]
pub struct SegmentFile {
    path: PathBuf,
    file: Arc<File>,
    capacity: u64,
}

impl SegmentFile {
    /// Opens a segment for writing, creating it if it does not exist.
    ///
    /// A new (or empty) segment gets `capacity` written into its header.
    /// Returns the segment and whether the header was written by this call.
    pub fn open_for_write(path: &Path, capacity: u64) -> CoreResult<(Self, bool)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| CoreError::segment_open(path, e))?;

        let len = file.metadata()?.len();
        if len == 0 {
            let mut writer = &file;
            writer.write_all(&capacity.to_be_bytes())?;
            file.sync_data()?;
            tracing::info!(path = %path.display(), capacity, "segment created");
            return Ok((
                Self {
                    path: path.to_path_buf(),
                    file: Arc::new(file),
                    capacity,
                },
                true,
            ));
        }

        let existing = read_capacity(&file, path)?;
        tracing::info!(path = %path.display(), capacity = existing, "segment reopened for write");
        Ok((
            Self {
                path: path.to_path_buf(),
                file: Arc::new(file),
                capacity: existing,
            },
            false,
        ))
    }

    /// Opens an existing segment read-only.
    pub fn open_for_read(path: &Path) -> CoreResult<Self> {
        let file = File::open(path).map_err(|e| CoreError::segment_open(path, e))?;
        let capacity = read_capacity(&file, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(file),
            capacity,
        })
    }

    /// Declared capacity from the segment header.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Path of the segment file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared handle, used to hold byte-range locks.
    #[must_use]
    pub fn handle(&self) -> &Arc<File> {
        &self.file
    }

    /// Current file length in bytes.
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Writes an encoded frame at an explicit offset.
    pub fn write_at(&self, offset: u64, frame: &[u8]) -> io::Result<()> {
        let mut file = &*self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(frame)
    }

    /// Reads the frame at `offset` and returns its payload.
    ///
    /// Fails with `UnexpectedEof` if the frame extends past the end of the
    /// file, without allocating the claimed payload size.
    pub fn read_frame_at(&self, offset: u64) -> io::Result<Vec<u8>> {
        let file_len = self.len()?;
        let mut file = &*self.file;
        file.seek(SeekFrom::Start(offset))?;

        let mut prefix = [0u8; ITEM_HEADER_BYTES as usize];
        file.read_exact(&mut prefix)?;
        let length = u32::from_be_bytes(prefix);

        let end = offset + ITEM_HEADER_BYTES + u64::from(length);
        if end > file_len {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("frame at {offset} ends at {end}, past file length {file_len}"),
            ));
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Walks every complete frame from the header to the end of the file.
    ///
    /// Does not consult or change any cursor. A trailing partial frame is
    /// ignored.
    pub fn scan(&self) -> CoreResult<Vec<FrameInfo>> {
        let file_len = self.len()?;
        let mut frames = Vec::new();
        let mut offset = HEADER_BYTES;
        let mut file = &*self.file;

        while offset + ITEM_HEADER_BYTES <= file_len {
            file.seek(SeekFrom::Start(offset))?;
            let mut prefix = [0u8; ITEM_HEADER_BYTES as usize];
            file.read_exact(&mut prefix)?;
            let frame = FrameInfo {
                offset,
                length: u32::from_be_bytes(prefix),
            };
            if frame.end() > file_len {
                break;
            }
            frames.push(frame);
            offset = frame.end();
        }

        Ok(frames)
    }

    /// Flushes file contents to disk.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_data()
    }
}

fn read_capacity(file: &File, path: &Path) -> CoreResult<u64> {
    let mut header = [0u8; HEADER_BYTES as usize];
    let mut reader = file;
    reader.seek(SeekFrom::Start(0))?;
    match reader.read_exact(&mut header) {
        Ok(()) => Ok(u64::from_be_bytes(header)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(CoreError::segment_corruption(
            format!("{} is shorter than its capacity header", path.display()),
        )),
        Err(e) => Err(e.into()),
    }
}
