//! Entry processor drain benchmarks.
//!
//! Measures how fast a processor drains a pre-populated partition log into a
//! handler that consumes every entry.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;
use tokio::runtime::Builder;

use strand_core::{PartitionId, Position, TopicName};
use strand_log::{LogStream, LogStreamConfig, RawRecord};
use strand_logstreams::{HandleResult, LogEntryProcessor};

async fn setup_populated_log(entry_count: usize, data_size: usize) -> (Arc<LogStream>, TempDir) {
    let tempdir = tempfile::tempdir().expect("failed to create temp dir");
    let config = LogStreamConfig::new(
        TopicName::try_from("bench").expect("valid topic"),
        PartitionId::new(0).expect("valid partition"),
        tempdir.path().join("bench.0"),
    );
    let stream = Arc::new(LogStream::open(config).await.expect("failed to open log"));

    let data = Bytes::from(vec![0u8; data_size]);
    stream
        .append_batch(std::iter::repeat(data).take(entry_count))
        .await
        .expect("append failed");

    (stream, tempdir)
}

fn bench_drain(c: &mut Criterion) {
    let rt = Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()
        .expect("failed to build runtime");

    let mut group = c.benchmark_group("processor_drain");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for &entry_count in &[1_000usize, 10_000] {
        for &max_cycles in &[1u32, 64, 1024] {
            group.throughput(Throughput::Elements(entry_count as u64));
            let id = format!("entries_{entry_count}_cycles_{max_cycles}");

            let (stream, _tmp) = rt.block_on(setup_populated_log(entry_count, 128));

            group.bench_with_input(BenchmarkId::new("consume_all", &id), &max_cycles, |b, &max_cycles| {
                b.iter(|| {
                    let handler = |position: Position, record: &RawRecord| {
                        black_box((position, record.len()));
                        HandleResult::Consume
                    };
                    let mut processor =
                        LogEntryProcessor::new(stream.reader(), RawRecord::with_capacity(128), handler);

                    let mut total = 0u32;
                    loop {
                        let work = processor.process(max_cycles).expect("process failed");
                        if work == 0 {
                            break;
                        }
                        total += work;
                    }
                    assert_eq!(total as usize, entry_count);
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_drain);
criterion_main!(benches);
