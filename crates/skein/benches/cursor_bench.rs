//! Benchmarks for Skein containers and cursor pipelines.
//!
//! Run with: cargo bench --package alopex-skein
//!
//! ## Benchmark Categories
//!
//! - **Container Writes**: Append and out-of-order set
//! - **Navigation**: Full scans and point lookups
//! - **Pipelines**: Filter/map chains, zip, moving statistics

use alopex_skein::container::ContainerCursor;
use alopex_skein::{Lookup, Series, SortedMap};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Generate typical time series data (regular intervals, slowly varying values).
fn generate_typical_timeseries(count: usize) -> Vec<(i64, f64)> {
    let start_ts = 1_000_000_000_i64;
    let interval = 1_000_000_000_i64;

    let mut value = 50.0;
    (0..count)
        .map(|i| {
            value += (i as f64 * 0.1).sin() * 0.1;
            (start_ts + (i as i64) * interval, value)
        })
        .collect()
}

fn completed_series(count: usize) -> Series<ContainerCursor<i64, f64>> {
    generate_typical_timeseries(count).into_iter().collect()
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("container_append");

    for size in [1_000, 10_000, 100_000].iter() {
        let points = generate_typical_timeseries(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &points, |b, points| {
            b.iter(|| {
                let mut writer = SortedMap::<i64, f64>::writer();
                for &(k, v) in points {
                    writer.append(k, v).unwrap();
                }
                black_box(writer.map().len())
            })
        });
    }

    group.finish();
}

fn bench_set_reversed(c: &mut Criterion) {
    let points = generate_typical_timeseries(10_000);

    c.bench_function("container_set_reversed_10k", |b| {
        b.iter(|| {
            let mut writer = SortedMap::<i64, f64>::writer();
            for &(k, v) in points.iter().rev() {
                writer.set(k, v).unwrap();
            }
            black_box(writer.map().len())
        })
    });
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_scan");

    for size in [1_000, 10_000, 100_000].iter() {
        let series = completed_series(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("forward", size), &series, |b, series| {
            b.iter(|| series.iter().map(|(_, v)| v).sum::<f64>())
        });
        group.bench_with_input(BenchmarkId::new("backward", size), &series, |b, series| {
            b.iter(|| series.iter_rev().map(|(_, v)| v).sum::<f64>())
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let series = completed_series(100_000);
    let trial = 1_000_000_000_i64 + 50_000 * 1_000_000_000 + 1;

    let mut group = c.benchmark_group("cursor_lookup");
    for direction in [Lookup::Eq, Lookup::Le, Lookup::Gt].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{direction:?}")),
            direction,
            |b, &direction| b.iter(|| series.try_find(black_box(&trial), direction)),
        );
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let series = completed_series(10_000);
    let mut group = c.benchmark_group("pipeline_10k");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("filter_map", |b| {
        let pipeline = series
            .filter_values(|v| *v > 50.0)
            .map(|k, v| (*k as f64) * 1e-9 + v);
        b.iter(|| pipeline.iter().count())
    });

    group.bench_function("zip_repeat", |b| {
        let sparse = series.filter_keys(|k| k % 7 == 0).repeat();
        let zipped = series.zip_with(&sparse, |a, b| a - b);
        b.iter(|| zipped.iter().count())
    });

    group.bench_function("sma_20", |b| {
        let sma = series.sma(20);
        b.iter(|| sma.iter().map(|(_, v)| v).sum::<f64>())
    });

    group.bench_function("stat2_20", |b| {
        let stats = series.stat2(20);
        b.iter(|| stats.iter().map(|(_, s)| s.variance).sum::<f64>())
    });

    group.bench_function("window_5", |b| {
        let windows = series.window(5, 1);
        b.iter(|| windows.iter().count())
    });

    group.finish();
}

criterion_group!(
    benches,
    // Container writes
    bench_append,
    bench_set_reversed,
    // Navigation
    bench_scan,
    bench_lookup,
    // Pipelines
    bench_pipeline,
);

criterion_main!(benches);
