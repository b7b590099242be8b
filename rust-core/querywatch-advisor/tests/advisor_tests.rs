// SPDX-License-Identifier: PMPL-1.0-or-later
//! End-to-end tests for the advisory engine

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use querywatch_advisor::detector::SESSION_ENTITY;
use querywatch_advisor::{
    AdvisorConfig, AdvisorContext, CacheRegionStats, InMemoryStatistics, ProblemType, Severity,
};
use tokio::sync::mpsc;

const CUSTOMER_QUERY: &str = "SELECT * FROM customers WHERE id = ?";

#[test]
fn test_customer_lookup_storm() {
    let ctx = AdvisorContext::open(AdvisorConfig::default()).unwrap();
    let stats = Arc::new(InMemoryStatistics::new());
    let collector = ctx.collector(stats.clone());
    let session = collector.start_session();

    for _ in 0..10 {
        collector.record(&session, CUSTOMER_QUERY, 5, 1);
    }
    stats.add_queries(10);
    stats.add_entities(10);

    let report = ctx.analyze(&session);
    assert_eq!(report.total_queries, 10);
    assert_eq!(report.total_entities, 10);

    let per_key: Vec<_> = report
        .problems_by_type(ProblemType::RepeatedSmallQuery)
        .into_iter()
        .filter(|p| p.entity != SESSION_ENTITY)
        .collect();
    assert_eq!(per_key.len(), 1);
    assert_eq!(per_key[0].entity, "customers");
    assert_eq!(per_key[0].query, CUSTOMER_QUERY);
    assert_eq!(per_key[0].query_count, 10);
    assert_eq!(per_key[0].severity, Severity::High);

    assert!(report.problems_by_type(ProblemType::SlowQuery).is_empty());
    assert!(report.problems_by_type(ProblemType::LargeResultSet).is_empty());

    let recs = ctx.recommendations(&report);
    let strategies: Vec<&str> = recs.iter().map(|r| r.strategy.as_str()).collect();
    assert!(recs.len() >= 3);
    assert_eq!(
        &strategies[..3],
        &["Use JOIN FETCH", "Enable batch fetching", "Use Entity Graph"]
    );

    let ranked = ctx.ranked_recommendations(&report);
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].severity, Severity::High);
}

#[test]
fn test_report_serializes_to_json() {
    let ctx = AdvisorContext::open(AdvisorConfig::default()).unwrap();
    let collector = ctx.collector(Arc::new(InMemoryStatistics::new()));
    let session = collector.start_session();
    collector.record(&session, "SELECT * FROM reports", 400, 2000);

    let report = ctx.analyze(&session);
    let json = serde_json::to_value(&report).unwrap();
    let types: Vec<&str> = json["problems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["problem_type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["SLOW_QUERY", "LARGE_RESULT_SET"]);
}

#[test]
fn test_concurrent_recording_across_threads() {
    let ctx = AdvisorContext::open(AdvisorConfig::default()).unwrap();
    let collector = ctx.collector(Arc::new(InMemoryStatistics::new()));
    let session = Arc::new(collector.start_session());

    let workers: Vec<_> = (0..16)
        .map(|worker| {
            let collector = collector.clone();
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for i in 0..250u64 {
                    let query = format!("SELECT * FROM table{} WHERE id = {i}", worker % 4);
                    collector.record(&session, &query, i as i64, i % 3);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // Digits in the table name are normalized too, so every worker shares one key.
    assert_eq!(session.distinct_queries(), 1);
    assert_eq!(session.total_observations(), 16 * 250);

    let exec = session.execution("SELECT * FROM table0 WHERE id = 0").unwrap();
    assert_eq!(exec.execution_times().len(), exec.row_counts().len());
    assert_eq!(exec.execution_count(), 4000);
}

#[tokio::test]
async fn test_cache_monitor_lifecycle() {
    let ctx = AdvisorContext::open(AdvisorConfig::default()).unwrap();
    let stats = Arc::new(InMemoryStatistics::new());
    stats.set_region(
        "customers",
        CacheRegionStats {
            hits: 2,
            misses: 8,
            puts: 8,
            element_count_in_memory: 20_000,
        },
    );

    let (tx, mut rx) = mpsc::channel(8);
    let handle = ctx
        .cache_monitor(stats.clone())
        .with_report_channel(tx)
        .start()
        .unwrap();
    assert!(handle.is_running());

    let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("first cycle runs immediately")
        .expect("channel open while monitor runs");
    assert_eq!(report.recommendations.len(), 2);

    handle.stop();
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "monitor should release its channel after stop");
}

#[test]
fn test_cache_metrics_through_context() {
    let ctx = AdvisorContext::open(AdvisorConfig::default()).unwrap();
    let stats = InMemoryStatistics::new();
    stats.update_cache(|c| {
        c.l2_hits = 3;
        c.l2_misses = 1;
        c.transactions = 12;
    });

    let snapshot = querywatch_advisor::CacheStatisticsSource::cache_snapshot(&stats);
    let metrics = ctx.export_metrics(&snapshot);
    assert!(metrics.contains("cache_l2_hit_ratio 0.7500\n"));
    assert!(metrics.contains("transactions_total 12\n"));
    assert!(!ctx.optimize_cache(&snapshot).has_issues);
}
