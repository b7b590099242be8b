// SPDX-License-Identifier: PMPL-1.0-or-later
//! Per-session query statistics.
//!
//! A [`MonitoringSession`] maps canonical query keys to [`QueryExecution`]
//! samples. Recording goes through the concurrent map's entry API, so the
//! insert-or-append for a key happens under that key's shard lock and
//! concurrent recorders never lose samples. Readers clone per-key snapshots
//! under the shard read lock and therefore never observe a half-written
//! `(time, rows)` pair.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::cache::{CacheRegionStats, CacheSnapshot, CacheStatisticsSource};
use crate::error::AdvisorError;
use crate::normalizer::normalize;
use crate::query_log::{LoggedQuery, QueryLogSink};

/// Global counters exposed by the persistence runtime.
///
/// `None` means statistics are disabled or unavailable; such counters are
/// treated as zero.
pub trait StatisticsSource: Send + Sync {
    /// Statements prepared since the runtime started.
    fn queries_executed(&self) -> Option<u64>;
    /// Entities materialized since the runtime started.
    fn entities_loaded(&self) -> Option<u64>;
}

/// Execution samples for one canonical query key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExecution {
    /// Canonical key the samples are grouped under.
    pub key: String,
    /// First raw query text observed for the key.
    pub query: String,
    execution_times: Vec<i64>,
    row_counts: Vec<u64>,
}

impl QueryExecution {
    fn new(key: String, query: &str) -> Self {
        Self {
            key,
            query: query.to_string(),
            execution_times: Vec::new(),
            row_counts: Vec::new(),
        }
    }

    /// Append one `(time, rows)` pair.
    fn record(&mut self, execution_time_ms: i64, row_count: u64) {
        self.execution_times.push(execution_time_ms);
        self.row_counts.push(row_count);
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_times.len() as u64
    }

    /// Truncating integer mean of the execution times; 0 when empty.
    ///
    /// Summed in 128 bits, so extreme samples cannot overflow.
    pub fn avg_execution_time(&self) -> i64 {
        if self.execution_times.is_empty() {
            return 0;
        }
        let sum: i128 = self.execution_times.iter().copied().map(i128::from).sum();
        // A mean lies between the smallest and largest sample.
        (sum / self.execution_times.len() as i128) as i64
    }

    /// Truncating integer mean of the row counts; 0 when empty.
    pub fn avg_row_count(&self) -> u64 {
        if self.row_counts.is_empty() {
            return 0;
        }
        let sum: u128 = self.row_counts.iter().copied().map(u128::from).sum();
        (sum / self.row_counts.len() as u128) as u64
    }

    pub fn max_row_count(&self) -> u64 {
        self.row_counts.iter().copied().max().unwrap_or(0)
    }

    pub fn execution_times(&self) -> &[i64] {
        &self.execution_times
    }

    pub fn row_counts(&self) -> &[u64] {
        &self.row_counts
    }
}

/// A bounded observation window with its own baselines and statistics.
///
/// Dropping the session discards everything it collected.
pub struct MonitoringSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    executions: DashMap<String, QueryExecution>,
    baseline_queries: u64,
    baseline_entities: u64,
    source: Arc<dyn StatisticsSource>,
}

impl MonitoringSession {
    /// Start a session, capturing the collaborator's current counters as
    /// baselines.
    pub fn new(source: Arc<dyn StatisticsSource>) -> Self {
        let baseline_queries = source.queries_executed().unwrap_or(0);
        let baseline_entities = source.entities_loaded().unwrap_or(0);
        Self::with_baseline(source, baseline_queries, baseline_entities)
    }

    /// Start a session with baselines the caller captured itself.
    pub fn with_baseline(
        source: Arc<dyn StatisticsSource>,
        baseline_queries: u64,
        baseline_entities: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            executions: DashMap::new(),
            baseline_queries,
            baseline_entities,
            source,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn baseline_queries(&self) -> u64 {
        self.baseline_queries
    }

    pub fn baseline_entities(&self) -> u64 {
        self.baseline_entities
    }

    /// Queries executed since the session started.
    pub fn total_queries_executed(&self) -> u64 {
        self.source
            .queries_executed()
            .unwrap_or(0)
            .saturating_sub(self.baseline_queries)
    }

    /// Entities loaded since the session started.
    pub fn total_entities_loaded(&self) -> u64 {
        self.source
            .entities_loaded()
            .unwrap_or(0)
            .saturating_sub(self.baseline_entities)
    }

    /// Atomically create or extend the statistics for `raw_query`'s key.
    fn record(&self, raw_query: &str, execution_time_ms: i64, row_count: u64) -> String {
        let key = normalize(raw_query);
        self.executions
            .entry(key.clone())
            .or_insert_with(|| QueryExecution::new(key.clone(), raw_query))
            .record(execution_time_ms, row_count);
        key
    }

    /// Consistent per-key copies of the statistics, sorted by key.
    pub fn snapshot(&self) -> Vec<QueryExecution> {
        let ordered: BTreeMap<String, QueryExecution> = self
            .executions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        ordered.into_values().collect()
    }

    /// Statistics for the key `raw_query` normalizes to.
    pub fn execution(&self, raw_query: &str) -> Result<QueryExecution, AdvisorError> {
        let key = normalize(raw_query);
        self.executions
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(AdvisorError::NotFound(key))
    }

    /// Number of distinct canonical keys observed.
    pub fn distinct_queries(&self) -> usize {
        self.executions.len()
    }

    /// Number of observations recorded across all keys.
    pub fn total_observations(&self) -> u64 {
        self.executions
            .iter()
            .map(|entry| entry.value().execution_count())
            .sum()
    }
}

impl std::fmt::Debug for MonitoringSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringSession")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("distinct_queries", &self.executions.len())
            .field("baseline_queries", &self.baseline_queries)
            .field("baseline_entities", &self.baseline_entities)
            .finish()
    }
}

/// Entry point for the observation feed.
#[derive(Clone)]
pub struct MetricsCollector {
    source: Arc<dyn StatisticsSource>,
    query_log: Option<QueryLogSink>,
}

impl MetricsCollector {
    pub fn new(source: Arc<dyn StatisticsSource>) -> Self {
        Self {
            source,
            query_log: None,
        }
    }

    /// Forward every recorded observation to a bounded query log.
    pub fn with_query_log(mut self, sink: QueryLogSink) -> Self {
        self.query_log = Some(sink);
        self
    }

    /// Start a session whose baselines are the collaborator's current counters.
    pub fn start_session(&self) -> MonitoringSession {
        let session = MonitoringSession::new(Arc::clone(&self.source));
        debug!(
            session = %session.id(),
            baseline_queries = session.baseline_queries(),
            baseline_entities = session.baseline_entities(),
            "Monitoring session started"
        );
        session
    }

    /// Record one execution. Values are accepted as-is.
    pub fn record(
        &self,
        session: &MonitoringSession,
        raw_query: &str,
        execution_time_ms: i64,
        row_count: u64,
    ) {
        session.record(raw_query, execution_time_ms, row_count);

        if let Some(ref sink) = self.query_log {
            sink.submit(LoggedQuery {
                session_id: session.id(),
                query: raw_query.to_string(),
                execution_time_ms,
                row_count,
                recorded_at: Utc::now(),
            });
        }
    }

    pub fn total_queries_executed(&self, session: &MonitoringSession) -> u64 {
        session.total_queries_executed()
    }

    pub fn total_entities_loaded(&self, session: &MonitoringSession) -> u64 {
        session.total_entities_loaded()
    }
}

/// Atomic-counter statistics for runtimes that count for themselves.
///
/// Implements both [`StatisticsSource`] and [`CacheStatisticsSource`].
#[derive(Debug)]
pub struct InMemoryStatistics {
    enabled: AtomicBool,
    queries: AtomicU64,
    entities: AtomicU64,
    cache: RwLock<CacheSnapshot>,
}

impl InMemoryStatistics {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            queries: AtomicU64::new(0),
            entities: AtomicU64::new(0),
            cache: RwLock::new(CacheSnapshot {
                statistics_enabled: true,
                ..CacheSnapshot::default()
            }),
        }
    }

    /// Toggle statistics; while disabled every counter reads as absent.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn add_queries(&self, n: u64) {
        self.queries.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_entities(&self, n: u64) {
        self.entities.fetch_add(n, Ordering::Relaxed);
    }

    /// Replace the counters of one cache region.
    pub fn set_region(&self, region: impl Into<String>, stats: CacheRegionStats) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.regions.insert(region.into(), stats);
    }

    /// Apply an arbitrary update to the global cache counters.
    pub fn update_cache(&self, update: impl FnOnce(&mut CacheSnapshot)) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut cache);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsSource for InMemoryStatistics {
    fn queries_executed(&self) -> Option<u64> {
        self.is_enabled()
            .then(|| self.queries.load(Ordering::Relaxed))
    }

    fn entities_loaded(&self) -> Option<u64> {
        self.is_enabled()
            .then(|| self.entities.load(Ordering::Relaxed))
    }
}

impl CacheStatisticsSource for InMemoryStatistics {
    fn cache_snapshot(&self) -> CacheSnapshot {
        if !self.is_enabled() {
            return CacheSnapshot::disabled();
        }
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        CacheSnapshot {
            statistics_enabled: true,
            ..cache.clone()
        }
    }
}
