//! End-to-end behaviour of backup scopes on a real file system.

use scopelog_core::{
    BackupContext, BackupScope, CoreError, IndexEntry, Location, MetaInfo, ScopeBuilder,
    ScopeConfig, ScopeState, HEADER_BYTES, ITEM_HEADER_BYTES,
};
use scopelog_testkit::{drain, open_scope, scenarios, write_all, TestScope};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const HELLO_WORLD: &str = "hello world, this is a test for rollover!!";

#[test]
fn rollover_creates_new_segments() {
    let scope = TestScope::with_segment_bytes(10);

    scope.try_write(HELLO_WORLD.as_bytes()).unwrap();
    scope.try_write(HELLO_WORLD.as_bytes()).unwrap();

    let meta = scope.meta().unwrap();
    assert_eq!(meta.write_start().segment_index(), 2);
    for index in 0..=2 {
        assert!(scope.path().join(format!("scope.backup_{index}")).is_file());
    }

    // Both records are still readable across the rollover.
    assert_eq!(drain(&scope), vec![HELLO_WORLD.as_bytes().to_vec(); 2]);
}

#[test]
fn concurrent_writers_account_every_byte() {
    let scope = TestScope::new();
    let threads = 8;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let scope = Arc::clone(&scope.scope);
            thread::spawn(move || {
                let mut written = 0u64;
                for i in 0..per_thread {
                    let payload = vec![b'x'; (t * per_thread + i) % 97];
                    scope.try_write(&payload).unwrap();
                    written += ITEM_HEADER_BYTES + payload.len() as u64;
                }
                written
            })
        })
        .collect();

    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let meta = scope.meta().unwrap();
    assert_eq!(meta.write_start(), Location::new(0, HEADER_BYTES + total));
    assert_eq!(meta.read_end().offset(), HEADER_BYTES + total - 1);
    assert_eq!(drain(&scope).len(), threads * per_thread);
}

#[test]
fn read_after_write_offsets() {
    let scope = TestScope::new();
    let first = b"the first record".to_vec();
    let second = b"and the second".to_vec();
    write_all(&scope, [&first, &second]);

    let len1 = first.len() as u64;
    let len2 = second.len() as u64;
    let meta = scope.meta().unwrap();

    assert_eq!(scope.try_read().unwrap(), Some(first));
    assert_eq!(
        meta.read_start().offset(),
        HEADER_BYTES + ITEM_HEADER_BYTES + len1
    );
    assert_eq!(scope.try_read().unwrap(), Some(second));
    assert_eq!(
        meta.read_start().offset(),
        HEADER_BYTES + 2 * ITEM_HEADER_BYTES + len1 + len2
    );
    assert_eq!(scope.try_read().unwrap(), None);
}

#[test]
fn has_offset_is_strict() {
    let a = Location::new(1, 10);
    assert!(!Location::has_offset(&a, &a));
    assert!(Location::has_offset(&a, &Location::new(1, 11)));
    assert!(Location::has_offset(&a, &Location::new(2, 0)));
    assert!(!Location::has_offset(&a, &Location::new(0, 99)));
}

#[test]
fn reattach_restores_cursors() {
    let scope = TestScope::with_segment_bytes(64);
    let records = scenarios::numbered_records(12);
    write_all(&scope, &records);
    let consumed: Vec<_> = (0..5).map(|_| scope.try_read().unwrap().unwrap()).collect();
    assert_eq!(consumed, records[..5]);

    let before = scope.meta().unwrap().snapshot();
    let scope = scope.reopen();
    assert_eq!(scope.meta().unwrap().snapshot(), before);

    // The reader resumes exactly where it stopped, mid-segment included.
    assert_eq!(drain(&scope), records[5..]);

    // And the writer appends after the previous tail.
    scope.try_write(b"after restart").unwrap();
    assert_eq!(drain(&scope), vec![b"after restart".to_vec()]);
}

#[test]
fn meta_file_survives_shutdown() {
    let scope = scenarios::populated_scope(3);
    let expected = scope.meta().unwrap().snapshot();
    scope.shutdown().unwrap();

    let on_disk = MetaInfo::read_from(&scope.path().join("scope.meta")).unwrap();
    assert_eq!(on_disk, expected);
    assert!(!scope.meta().unwrap().commit().unwrap());
}

#[test]
fn index_lookup_returns_stored_entries() {
    let temp = tempfile::tempdir().unwrap();
    let scope_dir = temp.path().join("indexed");
    std::fs::create_dir_all(&scope_dir).unwrap();

    let entries: HashMap<String, IndexEntry> = (0..3u64)
        .map(|i| (format!("key{i}"), IndexEntry::new(i, i, i)))
        .collect();
    std::fs::write(
        scope_dir.join("scope.idx"),
        serde_json::to_vec(&entries).unwrap(),
    )
    .unwrap();

    let ctx = BackupContext::new("index").unwrap();
    let scope = open_scope(temp.path(), "indexed", &ctx, ScopeConfig::default());

    for i in 0..3u64 {
        let entry = scope.lookup(&format!("key{i}")).unwrap();
        assert_eq!(entry, IndexEntry::new(i, i, i));
    }
    assert!(scope.lookup("key3").is_none());
    assert_eq!(scope.index().unwrap().len(), 3);
}

#[test]
fn async_writes_keep_submission_order() {
    let scope = TestScope::with_segment_bytes(128);
    let records = scenarios::numbered_records(200);

    let pending: Vec<_> = records
        .iter()
        .map(|r| scope.write_async(r.clone()).unwrap())
        .collect();
    for (record, handle) in records.iter().zip(pending) {
        assert_eq!(handle.wait().unwrap(), record.len() + 4);
    }

    assert_eq!(drain(&scope), records);
}

#[test]
fn async_queue_rejects_when_full() {
    let config = ScopeConfig::new().write_queue_capacity(1).unwrap();
    let scope = TestScope::with_config(config);

    // Submitting is far cheaper than a write plus two lock calls, so the
    // single slot fills almost immediately.
    let mut results = Vec::new();
    let mut rejected = false;
    for i in 0..100_000 {
        match scope.write_async(vec![b'a'; 64 + i % 7]) {
            Ok(pending) => results.push(pending),
            Err(CoreError::WriteQueueFull { capacity }) => {
                assert_eq!(capacity, 1);
                rejected = true;
                break;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(rejected);
    for pending in results {
        assert!(pending.wait().unwrap() > 0);
    }
}

#[test]
fn shutdown_waits_for_queued_writes() {
    let scope = TestScope::new();
    let pending: Vec<_> = (0..50)
        .map(|i| scope.write_async(format!("queued-{i}").into_bytes()).unwrap())
        .collect();

    scope.shutdown().unwrap();
    for handle in &pending {
        assert!(matches!(
            handle.wait_timeout(Duration::from_secs(1)),
            Some(Ok(n)) if n > 0
        ));
    }
    assert_eq!(scope.stats().records_written(), 50);
}

#[test]
fn init_without_context_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let scope = BackupScope::with_id(temp.path(), "lonely").unwrap();
    assert!(matches!(scope.init(), Err(CoreError::NotRegistered { .. })));
    assert_eq!(scope.state(), ScopeState::Ready);
}

#[test]
fn context_tracks_scopes() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = BackupContext::new("tracker").unwrap();
    let scopes: Vec<_> = (0..3)
        .map(|_| {
            ScopeBuilder::create(temp.path())
                .unwrap()
                .context(&ctx)
                .unwrap()
                .build()
        })
        .collect();

    assert_eq!(ctx.scope_count(), 3);
    for scope in &scopes {
        assert!(ctx.contains(scope.scope_id(), temp.path()));
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[test]
fn second_writer_is_locked_out() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = BackupContext::new("locks").unwrap();
    let first = open_scope(temp.path(), "shared", &ctx, ScopeConfig::default());
    first.try_write(b"owned").unwrap();

    let other_ctx = BackupContext::new("intruder").unwrap();
    let second = open_scope(temp.path(), "shared", &other_ctx, ScopeConfig::default());
    let result = second.open_write();

    assert!(matches!(result, Err(CoreError::LockDenied { .. })));
    assert_eq!(second.state(), ScopeState::Invalid);
    assert_eq!(second.try_write(b"ignored").unwrap(), 0);
    assert!(first.is_valid());

    // Once the owner lets go, a fresh instance can write again.
    first.shutdown().unwrap();
    drop(first);
    let third = open_scope(temp.path(), "shared", &ctx, ScopeConfig::default());
    assert!(third.try_write(b"mine now").unwrap() > 0);
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[test]
fn reader_instance_coexists_with_writer_instance() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = BackupContext::new("split").unwrap();
    let producer = open_scope(temp.path(), "split", &ctx, ScopeConfig::default());
    write_all(&producer, scenarios::numbered_records(5));
    producer.close_write().unwrap();
    assert!(producer.open_write().unwrap());

    let consumer = open_scope(temp.path(), "split", &ctx, ScopeConfig::default());
    assert_eq!(drain(&consumer), scenarios::numbered_records(5));
    assert!(consumer.is_valid());
    assert!(producer.is_valid());
}
