// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the QueryWatch hot paths

use std::collections::BTreeMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use querywatch_advisor::{
    normalize, CacheAdvisor, CacheRegionStats, CacheSnapshot, InMemoryStatistics,
    MetricsCollector, OperationDescription, OperationKind, ProblemDetector, TechnologyScorer,
};

/// Digit-free table name, so distinct indexes give distinct query keys.
fn table_name(mut i: usize) -> String {
    let mut name = String::from("t_");
    loop {
        name.push(char::from(b'a' + (i % 26) as u8));
        i /= 26;
        if i == 0 {
            return name;
        }
    }
}

// ============================================================================
// Normalizer Benchmarks
// ============================================================================

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalizer");

    let queries = [
        ("short", "SELECT * FROM customers WHERE id = 42".to_string()),
        (
            "literals",
            "SELECT * FROM users WHERE email = 'a@b.c' AND name = 'bob' AND age > 30".to_string(),
        ),
        (
            "in_list",
            format!(
                "SELECT * FROM orders WHERE id IN ({})",
                (0..200).map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
            ),
        ),
    ];

    for (name, query) in &queries {
        group.bench_with_input(BenchmarkId::new("normalize", name), query, |b, q| {
            b.iter(|| black_box(normalize(q)))
        });
    }

    group.finish();
}

// ============================================================================
// Collector Benchmarks
// ============================================================================

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("collector");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("record_1000_same_key", |b| {
        let collector = MetricsCollector::new(Arc::new(InMemoryStatistics::new()));
        b.iter(|| {
            let session = collector.start_session();
            for i in 0..1000 {
                collector.record(&session, &format!("SELECT * FROM t WHERE id = {i}"), 5, 1);
            }
            black_box(session.total_observations())
        });
    });

    group.bench_function("record_1000_distinct_keys", |b| {
        let collector = MetricsCollector::new(Arc::new(InMemoryStatistics::new()));
        let tables: Vec<String> = (0..1000)
            .map(|i| format!("SELECT * FROM {} WHERE id = 1", table_name(i)))
            .collect();
        b.iter(|| {
            let session = collector.start_session();
            for q in &tables {
                collector.record(&session, q, 5, 1);
            }
            black_box(session.distinct_queries())
        });
    });

    group.finish();
}

// ============================================================================
// Detector Benchmarks
// ============================================================================

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("detector");

    for keys in [10usize, 100, 1000] {
        let stats = Arc::new(InMemoryStatistics::new());
        let collector = MetricsCollector::new(stats.clone());
        let session = collector.start_session();
        for k in 0..keys {
            let query = format!("SELECT * FROM {} WHERE id = 1", table_name(k));
            for _ in 0..10 {
                collector.record(&session, &query, 120, 1);
            }
        }
        stats.add_queries((keys * 10) as u64);
        stats.add_entities(keys as u64);

        let detector = ProblemDetector::default();
        group.throughput(Throughput::Elements(keys as u64));
        group.bench_with_input(BenchmarkId::new("analyze", keys), &keys, |b, _| {
            b.iter(|| black_box(detector.analyze(&session)))
        });
    }

    group.finish();
}

// ============================================================================
// Cache Advisor Benchmarks
// ============================================================================

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");

    let mut regions = BTreeMap::new();
    for i in 0..500u64 {
        regions.insert(
            format!("region-{i:04}"),
            CacheRegionStats {
                hits: i,
                misses: 500 - i,
                puts: i,
                element_count_in_memory: i * 40,
            },
        );
    }
    let snapshot = CacheSnapshot {
        statistics_enabled: true,
        regions,
        l2_hits: 1000,
        l2_misses: 400,
        query_cache_hits: 10,
        query_cache_misses: 90,
        ..CacheSnapshot::default()
    };
    let advisor = CacheAdvisor::default();

    group.bench_function("optimize_cache_500_regions", |b| {
        b.iter(|| black_box(advisor.optimize_cache(&snapshot)))
    });
    group.bench_function("export_metrics", |b| {
        b.iter(|| black_box(advisor.export_metrics(&snapshot)))
    });

    group.finish();
}

// ============================================================================
// Scorer Benchmarks
// ============================================================================

fn bench_scorer(c: &mut Criterion) {
    let scorer = TechnologyScorer::new();
    let op = OperationDescription::new(OperationKind::Search)
        .with_complex_queries(true)
        .with_caching(true)
        .with_expected_volume(50_000);

    c.bench_function("scorer/recommend", |b| b.iter(|| black_box(scorer.recommend(&op))));
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(normalizer_benches, bench_normalize);

criterion_group!(collector_benches, bench_record);

criterion_group!(detector_benches, bench_analyze);

criterion_group!(cache_benches, bench_cache);

criterion_group!(scorer_benches, bench_scorer);

criterion_main!(
    normalizer_benches,
    collector_benches,
    detector_benches,
    cache_benches,
    scorer_benches
);
