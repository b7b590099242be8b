// SPDX-License-Identifier: PMPL-1.0-or-later
//! JSON input documents for the CLI.
//!
//! A session document replays recorded observations into a fresh monitoring
//! session; a snapshot file can be re-read on every monitor cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use querywatch_advisor::{
    CacheSnapshot, CacheStatisticsSource, MetricsCollector, MonitoringSession, StatisticsSource,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Global runtime counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counters {
    pub queries: u64,
    pub entities: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub query: String,
    pub execution_time_ms: i64,
    #[serde(default)]
    pub row_count: u64,
}

/// Recorded session: counters before and after, plus every observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInput {
    pub baseline: Counters,
    pub current: Counters,
    pub observations: Vec<Observation>,
}

/// Counters frozen at the recorded "current" values.
struct RecordedStatistics(Counters);

impl StatisticsSource for RecordedStatistics {
    fn queries_executed(&self) -> Option<u64> {
        Some(self.0.queries)
    }

    fn entities_loaded(&self) -> Option<u64> {
        Some(self.0.entities)
    }
}

impl SessionInput {
    /// Build a session with the recorded baselines and feed it every
    /// observation through `collector`.
    pub fn replay(&self, collector: &MetricsCollector) -> MonitoringSession {
        let session = MonitoringSession::with_baseline(
            Arc::new(RecordedStatistics(self.current)),
            self.baseline.queries,
            self.baseline.entities,
        );
        for obs in &self.observations {
            collector.record(&session, &obs.query, obs.execution_time_ms, obs.row_count);
        }
        session
    }

    /// Source reporting the recorded current counters.
    pub fn statistics(&self) -> Arc<dyn StatisticsSource> {
        Arc::new(RecordedStatistics(self.current))
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

/// Cache snapshot re-read from disk on every poll.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheStatisticsSource for SnapshotFile {
    // Blocking read; the monitor calls this from the blocking pool.
    fn cache_snapshot(&self) -> CacheSnapshot {
        match read_json(&self.path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Snapshot unavailable, treating statistics as disabled");
                CacheSnapshot::disabled()
            }
        }
    }
}
