//! Throughput Benchmark for keyheat
//!
//! This benchmark measures the hot paths of the analyzer: request parsing,
//! payload ingestion, pool recording and snapshot ranking.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use keyheat::pool::{HotKeyPool, Observation, ReportLimit};
use keyheat::protocol::{commands, parse_command};
use keyheat::{Ingestor, KeyClassifier};
use std::sync::Arc;
use std::time::Duration;

/// A pipelined payload mixing retrievals, storage commands and keyless ones.
fn pipelined_payload(commands: usize) -> Vec<u8> {
    let mut payload = Vec::new();
    for i in 0..commands {
        match i % 4 {
            0 => payload.extend_from_slice(format!("get user_{} user_{}\r\n", i, i + 1).as_bytes()),
            1 => payload.extend_from_slice(
                format!("set session:{} 0 300 5\r\nhello\r\n", i).as_bytes(),
            ),
            2 => payload.extend_from_slice(format!("delete item:{}\r\n", i).as_bytes()),
            _ => payload.extend_from_slice(b"version\r\n"),
        }
    }
    payload
}

/// Benchmark command parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let single = b"get user_1842\r\n";
    group.throughput(Throughput::Bytes(single.len() as u64));
    group.bench_function("get_single", |b| {
        b.iter(|| black_box(parse_command(black_box(single))));
    });

    let storage = b"set session:ab12 0 300 11\r\nhello world\r\n";
    group.throughput(Throughput::Bytes(storage.len() as u64));
    group.bench_function("set_with_data", |b| {
        b.iter(|| black_box(parse_command(black_box(storage))));
    });

    let payload = pipelined_payload(64);
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("pipelined_64", |b| {
        b.iter(|| black_box(commands(black_box(&payload)).count()));
    });

    group.finish();
}

/// Benchmark full payload ingestion
fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    let payload = pipelined_payload(64);
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("raw_keys", |b| {
        let ingestor = Ingestor::new(
            Arc::new(HotKeyPool::new()),
            Arc::new(HotKeyPool::new()),
            KeyClassifier::default(),
            false,
        );
        b.iter(|| ingestor.ingest(black_box(&payload)));
    });

    group.bench_function("classified", |b| {
        let classifier = KeyClassifier::new([
            ("^user_[0-9]+$", "user"),
            ("^session:", "session"),
            ("^item:", "item"),
        ])
        .unwrap();
        let ingestor = Ingestor::new(
            Arc::new(HotKeyPool::new()),
            Arc::new(HotKeyPool::new()),
            classifier,
            false,
        );
        b.iter(|| ingestor.ingest(black_box(&payload)));
    });

    group.finish();
}

/// Benchmark recording into the pool
fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hot_key", |b| {
        let pool = HotKeyPool::new();
        b.iter(|| pool.record(&[Observation::new(black_box("user"), "get")]));
    });

    group.bench_function("distinct_keys", |b| {
        let pool = HotKeyPool::new();
        let names: Vec<String> = (0..10_000).map(|i| format!("key:{}", i)).collect();
        let mut i = 0usize;
        b.iter(|| {
            pool.record(&[Observation::new(&names[i % names.len()], "get")]);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent recording
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_record", |b| {
        b.iter(|| {
            let pool = Arc::new(HotKeyPool::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let pool = Arc::clone(&pool);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let name = format!("key:{}:{}", t, i % 100);
                            pool.record(&[Observation::new(&name, "get")]);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(pool.rotate().len());
        });
    });

    group.finish();
}

/// Benchmark rotation and ranking
fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");

    let fill = |pool: &HotKeyPool| {
        for i in 0..10_000u64 {
            let name = format!("key:{}", i);
            for _ in 0..(i % 7) + 1 {
                pool.record(&[Observation::new(&name, "get")]);
            }
        }
    };

    group.bench_function("rotate_top_20", |b| {
        let pool = HotKeyPool::new();
        b.iter(|| {
            fill(&pool);
            black_box(pool.rotate().top(ReportLimit::Top(20)));
        });
    });

    group.bench_function("rotate_unlimited", |b| {
        let pool = HotKeyPool::new();
        b.iter(|| {
            fill(&pool);
            black_box(pool.rotate().top(ReportLimit::Unlimited));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_ingest,
    bench_record,
    bench_concurrent,
    bench_rank,
);

criterion_main!(benches);
