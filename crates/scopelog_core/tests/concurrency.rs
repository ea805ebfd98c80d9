//! Producer/consumer behaviour under concurrent load.

use scopelog_core::{ScopeConfig, HEADER_BYTES};
use scopelog_testkit::{
    drain, parse_payload, record_payload, stress_concurrent_writes, stress_producer_consumer,
    StressConfig, TestScope,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

fn assert_per_thread_order(records: &[Vec<u8>], threads: usize, per_thread: usize) {
    let mut next: HashMap<usize, usize> = HashMap::new();
    for record in records {
        let (thread, seq) = parse_payload(record).expect("untagged record");
        let expected = next.entry(thread).or_insert(0);
        assert_eq!(seq, *expected, "thread {thread} out of order");
        *expected += 1;
    }
    assert_eq!(next.len(), threads);
    assert!(next.values().all(|&n| n == per_thread));
}

#[test]
fn stress_writes_single_segment() {
    let scope = TestScope::new();
    let config = StressConfig {
        operations: 2_000,
        threads: 8,
        record_size: 48,
        ..Default::default()
    };

    let (result, bytes) = stress_concurrent_writes(Arc::clone(&scope.scope), &config);
    assert_eq!(result.failed_ops, 0);
    assert_eq!(result.successful_ops, 2_000);
    assert_eq!(bytes, 2_000 * (4 + 48));

    let meta = scope.meta().unwrap();
    assert_eq!(meta.write_start().offset(), HEADER_BYTES + bytes);
    assert_per_thread_order(&drain(&scope), 8, 250);
}

#[test]
fn stress_writes_many_segments() {
    let scope = TestScope::with_segment_bytes(512);
    let config = StressConfig {
        operations: 1_200,
        threads: 6,
        record_size: 40,
        ..Default::default()
    };

    let (result, _) = stress_concurrent_writes(Arc::clone(&scope.scope), &config);
    assert_eq!(result.failed_ops, 0);
    assert!(scope.meta().unwrap().write_start().segment_index() > 10);
    assert!(scope.stats().snapshot().write_rotations > 10);
    assert_per_thread_order(&drain(&scope), 6, 200);
}

#[test]
fn producer_consumer_across_rollovers() {
    let scope = TestScope::with_segment_bytes(1_000);
    let config = StressConfig {
        operations: 1_000,
        threads: 4,
        record_size: 24,
        ..Default::default()
    };

    let (result, consumed) = stress_producer_consumer(Arc::clone(&scope.scope), &config);
    assert_eq!(result.successful_ops, 1_000);
    assert_eq!(consumed.len(), 1_000);
    assert_per_thread_order(&consumed, 4, 250);
    assert!(scope.is_valid());
}

#[test]
fn async_and_sync_writers_interleave() {
    let scope = TestScope::with_segment_bytes(256);

    let async_writer = {
        let scope = Arc::clone(&scope.scope);
        thread::spawn(move || {
            let pending: Vec<_> = (0..300)
                .map(|seq| scope.write_async(record_payload(0, seq, 16)).unwrap())
                .collect();
            pending.into_iter().all(|p| p.wait().unwrap() > 0)
        })
    };
    let sync_writer = {
        let scope = Arc::clone(&scope.scope);
        thread::spawn(move || {
            (0..300).all(|seq| scope.try_write(&record_payload(1, seq, 16)).unwrap() > 0)
        })
    };

    assert!(async_writer.join().unwrap());
    assert!(sync_writer.join().unwrap());
    assert_per_thread_order(&drain(&scope), 2, 300);

    let stats = scope.stats().snapshot();
    assert_eq!(stats.records_written, 600);
    assert_eq!(stats.records_read, 600);
}

#[test]
fn large_queue_absorbs_bursts() {
    let config = ScopeConfig::new().write_queue_capacity(10_000).unwrap();
    let scope = TestScope::with_config(config);

    let pending: Vec<_> = (0..5_000)
        .map(|seq| scope.write_async(record_payload(0, seq, 8)).unwrap())
        .collect();
    for p in pending {
        assert!(p.wait().unwrap() > 0);
    }
    assert_per_thread_order(&drain(&scope), 1, 5_000);
}
