//! Addresses within a scope's logical stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(segment index, byte offset)` address.
///
/// Offsets are file offsets and therefore count the 8-byte capacity header
/// at the start of every segment. Locations are ordered by segment first,
/// then offset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(alias = "backupFileIndex")]
    segment_index: u64,
    #[serde(alias = "backupFileOffset")]
    offset: u64,
}

impl Location {
    /// The start of segment zero.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a location.
    #[must_use]
    pub const fn new(segment_index: u64, offset: u64) -> Self {
        Self {
            segment_index,
            offset,
        }
    }

    /// Index of the segment file.
    #[must_use]
    pub const fn segment_index(&self) -> u64 {
        self.segment_index
    }

    /// Byte offset within the segment file.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns true if `b` lies strictly after `a`.
    ///
    /// This is the single "is there data between these two cursors" test:
    /// equal locations yield `false`.
    #[must_use]
    pub const fn has_offset(a: &Self, b: &Self) -> bool {
        if b.segment_index < a.segment_index {
            return false;
        }
        if b.segment_index > a.segment_index {
            return true;
        }
        b.offset > a.offset
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.segment_index, self.offset)
    }
}
