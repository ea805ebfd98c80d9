//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use proptest::prelude::*;
use scopelog_core::{Location, ScopeConfig, HEADER_BYTES};

/// Strategy for generating locations.
pub fn location_strategy() -> impl Strategy<Value = Location> {
    (0u64..8, 0u64..4096).prop_map(|(segment, offset)| Location::new(segment, offset))
}

/// Strategy for generating record payloads (arbitrary bytes, possibly empty).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for generating a batch of record payloads.
pub fn payload_batch_strategy(max_records: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(), 1..=max_records.max(1))
}

/// Strategy for generating valid scope identifiers.
pub fn scope_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating segment capacities, from tiny (one frame per
/// segment) to comfortably large.
pub fn segment_bytes_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![HEADER_BYTES + 1..64u64, 64u64..4096]
}

/// Strategy for generating valid scope configurations.
pub fn config_strategy() -> impl Strategy<Value = ScopeConfig> {
    (segment_bytes_strategy(), 1u64..4096).prop_map(|(segment, buffer)| {
        ScopeConfig::new()
            .max_segment_bytes(segment)
            .and_then(|c| c.content_buffer_bytes(buffer))
            .expect("Generated config out of range")
    })
}
