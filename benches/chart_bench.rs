//! Benchmarks for the chart pipeline and the document log
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;
use weatherboard::chart::{reconcile, render_svg, ticks, ChartBinder, ChartOptions, JoinBy};
use weatherboard::store::{DocumentLog, DocumentStore, LocalStore, LogSyncMode, Query};
use weatherboard::Reading;

fn window(len: i64, offset: i64) -> Vec<Reading> {
    (0..len)
        .map(|i| Reading::new((i * 7 + offset) % 100, 1_700_000_000_000 + (i + offset) * 1000))
        .collect()
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for size in [10_i64, 100, 1000] {
        let previous: Vec<i64> = (0..size).collect();
        let next: Vec<i64> = (1..=size).collect();

        group.throughput(Throughput::Elements(size as u64));
        for join_by in [JoinBy::Index, JoinBy::Key] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", join_by), size),
                &(previous.clone(), next.clone()),
                |b, (previous, next)| {
                    b.iter(|| {
                        reconcile(
                            black_box(previous.as_slice()),
                            black_box(next.as_slice()),
                            join_by,
                        )
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("binder");

    let first = window(10, 0);
    let slid = window(10, 1);

    group.bench_function("update_sliding_window", |b| {
        let mut binder = ChartBinder::new(ChartOptions::default());
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let data = if flip { &first } else { &slid };
            binder.update(black_box(data))
        });
    });

    group.bench_function("render_svg", |b| {
        let mut binder = ChartBinder::new(ChartOptions::default());
        binder.update(&first);
        let frame = binder.frame();
        b.iter(|| render_svg(black_box(&frame)));
    });

    group.bench_function("ticks", |b| {
        b.iter(|| ticks(black_box(0.0), black_box(97.0), black_box(10)));
    });

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    group.bench_function("log_append", |b| {
        let dir = tempdir().unwrap();
        let (mut log, _) = DocumentLog::open(dir.path().join("bench.log"), LogSyncMode::None).unwrap();
        let store = LocalStore::in_memory();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let doc = runtime
            .block_on(store.append("weather", Reading::new(21, 1).to_fields()))
            .unwrap();

        b.iter(|| log.append(black_box(&doc)).unwrap());
    });

    group.bench_function("query_recent_window", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = LocalStore::in_memory();
        runtime.block_on(async {
            for reading in window(1000, 0) {
                store.append("weather", reading.to_fields()).await.unwrap();
            }
        });
        let query = Query::collection("weather")
            .order_by("timestamp", weatherboard::Direction::Desc)
            .limit(10);

        b.iter(|| runtime.block_on(store.query(black_box(&query))).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_reconcile, bench_update, bench_store);
criterion_main!(benches);
