//! Stress utilities for scopelog.
//!
//! These helpers drive scopes under heavy load and concurrent access.

use scopelog_core::BackupScope;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of records to write.
    pub operations: usize,
    /// Number of concurrent writer threads.
    pub threads: usize,
    /// Size of each record payload in bytes.
    pub record_size: usize,
    /// How long the consumer may run before giving up.
    pub timeout: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            record_size: 64,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Writes `config.operations` records from `config.threads` threads at once.
///
/// Returns the write result and the total number of bytes written.
pub fn stress_concurrent_writes(
    scope: Arc<BackupScope>,
    config: &StressConfig,
) -> (StressTestResult, u64) {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let bytes = Arc::new(AtomicUsize::new(0));
    let per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let scope = Arc::clone(&scope);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let bytes = Arc::clone(&bytes);
            let record_size = config.record_size;

            thread::spawn(move || {
                for i in 0..per_thread {
                    let payload = record_payload(t, i, record_size);
                    match scope.try_write(&payload) {
                        Ok(n) if n > 0 => {
                            successful.fetch_add(1, Ordering::Relaxed);
                            bytes.fetch_add(n, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Writer thread panicked");
    }

    let result = StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    );
    (result, bytes.load(Ordering::Relaxed) as u64)
}

/// Runs concurrent writers against one polling reader.
///
/// The reader stops once it has consumed every written record or the
/// timeout expires. Returns the write result and the consumed records.
pub fn stress_producer_consumer(
    scope: Arc<BackupScope>,
    config: &StressConfig,
) -> (StressTestResult, Vec<Vec<u8>>) {
    let expected = (config.operations / config.threads.max(1)) * config.threads;
    let writers_done = Arc::new(AtomicBool::new(false));

    let consumer = {
        let scope = Arc::clone(&scope);
        let writers_done = Arc::clone(&writers_done);
        let timeout = config.timeout;
        thread::spawn(move || {
            let deadline = Instant::now() + timeout;
            let mut consumed = Vec::with_capacity(expected);
            while consumed.len() < expected && Instant::now() < deadline {
                match scope.try_read() {
                    Ok(Some(record)) => consumed.push(record),
                    Ok(None) if writers_done.load(Ordering::Acquire) => {
                        thread::sleep(Duration::from_millis(1));
                    }
                    Ok(None) => thread::sleep(Duration::from_millis(5)),
                    Err(_) => break,
                }
            }
            consumed
        })
    };

    let (result, _) = stress_concurrent_writes(Arc::clone(&scope), config);
    writers_done.store(true, Ordering::Release);
    let consumed = consumer.join().expect("Reader thread panicked");
    (result, consumed)
}

/// Payload tagged with its writer thread and sequence number.
pub fn record_payload(thread: usize, seq: usize, size: usize) -> Vec<u8> {
    let tag = format!("{thread}:{seq}:");
    let mut payload = tag.into_bytes();
    payload.resize(size.max(payload.len()), b'.');
    payload
}

/// Parses the `(thread, seq)` tag written by [`record_payload`].
pub fn parse_payload(payload: &[u8]) -> Option<(usize, usize)> {
    let text = std::str::from_utf8(payload).ok()?;
    let mut parts = text.splitn(3, ':');
    let thread = parts.next()?.parse().ok()?;
    let seq = parts.next()?.parse().ok()?;
    Some((thread, seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestScope;
    use std::collections::HashMap;

    #[test]
    fn test_concurrent_writes() {
        let test_scope = TestScope::new();
        let config = StressConfig {
            operations: 400,
            threads: 4,
            record_size: 32,
            ..Default::default()
        };

        let (result, bytes) = stress_concurrent_writes(Arc::clone(&test_scope.scope), &config);
        assert_eq!(result.successful_ops, 400);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(bytes, 400 * 36);
    }

    #[test]
    fn test_producer_consumer_preserves_per_thread_order() {
        let test_scope = TestScope::with_segment_bytes(1000);
        let config = StressConfig {
            operations: 1000,
            threads: 4,
            record_size: 24,
            timeout: Duration::from_secs(60),
        };

        let (result, consumed) = stress_producer_consumer(Arc::clone(&test_scope.scope), &config);
        assert_eq!(result.successful_ops, 1000);
        assert_eq!(consumed.len(), 1000);
        assert!(test_scope.is_valid());

        let mut next_seq: HashMap<usize, usize> = HashMap::new();
        for record in &consumed {
            let (thread, seq) = parse_payload(record).unwrap();
            let expected = next_seq.entry(thread).or_insert(0);
            assert_eq!(seq, *expected, "thread {thread} out of order");
            *expected += 1;
        }
    }

    #[test]
    fn test_payload_tag_roundtrip() {
        let payload = record_payload(3, 17, 32);
        assert_eq!(payload.len(), 32);
        assert_eq!(parse_payload(&payload), Some((3, 17)));
    }
}
