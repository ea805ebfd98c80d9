//! Backup scope benchmarks.

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use rand::Rng;
use scopelog_core::{BackupContext, BackupScope, ScopeBuilder, ScopeConfig};
use std::sync::Arc;
use tempfile::TempDir;

/// Generate random data of the specified size.
fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Open an initialized scope in a fresh temporary directory.
fn open_scope(config: ScopeConfig) -> (TempDir, BackupScope) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = BackupContext::new("bench").unwrap();
    let scope = ScopeBuilder::with_id(temp_dir.path(), "bench")
        .unwrap()
        .context(&ctx)
        .unwrap()
        .config(config)
        .unwrap()
        .build();
    scope.init().unwrap();
    (temp_dir, scope)
}

/// Benchmark synchronous appends within one large segment.
fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let config = ScopeConfig::new().max_segment_bytes(1 << 30).unwrap();
            let (_temp_dir, scope) = open_scope(config);
            let data = random_data(size);

            b.iter(|| {
                let written = scope.try_write(black_box(&data)).unwrap();
                black_box(written);
            });
        });
    }

    group.finish();
}

/// Benchmark appends that roll over to a new segment every few records.
fn bench_write_rollover(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_rollover");

    // Every rollover syncs and creates a file
    group.sample_size(20);

    for segment_bytes in [4 * 1024, 64 * 1024].iter() {
        group.throughput(Throughput::Bytes(256));
        group.bench_with_input(
            BenchmarkId::from_parameter(segment_bytes),
            segment_bytes,
            |b, &segment_bytes| {
                let config = ScopeConfig::new()
                    .max_segment_bytes(segment_bytes)
                    .unwrap();
                let (_temp_dir, scope) = open_scope(config);
                let data = random_data(256);

                b.iter(|| {
                    let written = scope.try_write(black_box(&data)).unwrap();
                    black_box(written);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark draining a populated scope.
fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");
    group.sample_size(20);

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let data = random_data(256);

            b.iter_batched(
                || {
                    let (temp_dir, scope) = open_scope(ScopeConfig::default());
                    for _ in 0..count {
                        scope.try_write(&data).unwrap();
                    }
                    (temp_dir, scope)
                },
                |(_temp_dir, scope)| {
                    let mut read = 0;
                    while let Some(record) = scope.try_read().unwrap() {
                        black_box(record);
                        read += 1;
                    }
                    assert_eq!(read, count);
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

/// Benchmark the background writer, waiting for each batch to land.
fn bench_async_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_write");

    for batch_size in [10, 100].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let config = ScopeConfig::new()
                    .max_segment_bytes(1 << 30)
                    .unwrap()
                    .write_queue_capacity(batch_size)
                    .unwrap();
                let (_temp_dir, scope) = open_scope(config);
                let scope = Arc::new(scope);

                // Pre-generate data
                let records: Vec<_> = (0..batch_size).map(|_| random_data(256)).collect();

                b.iter(|| {
                    let pending: Vec<_> = records
                        .iter()
                        .map(|r| scope.write_async(black_box(r.clone())).unwrap())
                        .collect();
                    for p in pending {
                        black_box(p.wait().unwrap());
                    }
                });

                scope.shutdown().unwrap();
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_write,
    bench_write_rollover,
    bench_drain,
    bench_async_write
);
criterion_main!(benches);
