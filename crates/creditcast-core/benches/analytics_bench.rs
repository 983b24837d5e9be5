//! Performance benchmarks for the projection engine
//!
//! Samples cover 1 to 4 services over 30 to 365 days, which spans a
//! short POC up to a full year of usage history.

use chrono::{Duration, NaiveDate};
use creditcast_core::analytics::{
    assess_maturity, linear_fallback, project_growth, rolling_by_service, week_over_week,
};
use creditcast_core::models::{UsageRecord, UsageSample, KNOWN_SERVICES};
use creditcast_core::Snapshot;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Generate a sample with a mild upward trend and a weekly wobble
fn generate_sample(days: usize, services: usize) -> UsageSample {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut records = Vec::with_capacity(days * services);
    for day in 0..days {
        for (i, service) in KNOWN_SERVICES.iter().take(services).enumerate() {
            let credits = 5.0 + i as f64 + day as f64 * 0.05 + (day % 7) as f64 * 0.3;
            records.push(UsageRecord::new(
                start + Duration::days(day as i64),
                service,
                credits,
                10.0 + (day % 5) as f64,
                100 + day as u64,
            ));
        }
    }
    UsageSample::new(records)
}

/// Benchmark 1: snapshot (maturity + run rate + intervals)
fn snapshot_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for days in [30, 90, 365] {
        let sample = generate_sample(days, 4);
        group.bench_with_input(BenchmarkId::new("days", days), &sample, |b, sample| {
            b.iter(|| black_box(Snapshot::compute(sample, 3.0, None)));
        });
    }

    group.finish();
}

/// Benchmark 2: growth projection over 12 and 36 months
fn growth_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_growth");
    let sample = generate_sample(90, 4);

    for months in [12, 36] {
        group.bench_with_input(BenchmarkId::new("months", months), &months, |b, &months| {
            b.iter(|| black_box(project_growth(&sample, 0.25, months, 3.0)));
        });
    }

    group.finish();
}

/// Benchmark 3: linear trend fallback
fn forecast_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_fallback");

    for days in [7, 90, 365] {
        let sample = generate_sample(days, 2);
        group.bench_with_input(BenchmarkId::new("days", days), &sample, |b, sample| {
            b.iter(|| black_box(linear_fallback(sample, 12, 3.0)));
        });
    }

    group.finish();
}

/// Benchmark 4: per-service rolling windows and week-over-week alerts
fn history_benchmark(c: &mut Criterion) {
    let sample = generate_sample(365, 4);

    c.bench_function("rolling_by_service_30d", |b| {
        b.iter(|| black_box(rolling_by_service(&sample, 30)));
    });

    c.bench_function("week_over_week", |b| {
        b.iter(|| black_box(week_over_week(&sample)));
    });

    c.bench_function("assess_maturity", |b| {
        b.iter(|| black_box(assess_maturity(&sample)));
    });
}

criterion_group!(
    benches,
    snapshot_benchmark,
    growth_benchmark,
    forecast_benchmark,
    history_benchmark
);
criterion_main!(benches);
