// SPDX-License-Identifier: PMPL-1.0-or-later
//! Advisor configuration.
//!
//! Defaults reproduce the fixed thresholds of the detection rules:
//! - repeated small query: > 3 executions averaging < 2 rows
//! - slow query: average > 100ms
//! - large result set: > 1000 rows in one execution
//! - inefficient frequent query: > 50 executions averaging < 5 rows
//! - cache regions: hit ratio < 0.5 or > 10000 elements in memory
//! - query cache: hit ratio < 0.3
//! - monitor interval: 60s

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// Thresholds used by [`ProblemDetector`](crate::detector::ProblemDetector).
///
/// Every comparison is strict (`>` / `<`), matching the rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorThresholds {
    /// A key executed more than this many times may be a repeated small query.
    pub repeated_query_min_executions: u64,
    /// ...when its average row count is below this.
    pub repeated_query_max_avg_rows: u64,
    /// Average execution time (ms) above which a key is slow.
    pub slow_query_ms: i64,
    /// Maximum row count above which a key returns a large result set.
    pub large_result_set_rows: u64,
    /// A key executed more than this many times may be inefficient.
    pub frequent_query_min_executions: u64,
    /// ...when its average row count is below this.
    pub frequent_query_max_avg_rows: u64,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            repeated_query_min_executions: 3,
            repeated_query_max_avg_rows: 2,
            slow_query_ms: 100,
            large_result_set_rows: 1000,
            frequent_query_min_executions: 50,
            frequent_query_max_avg_rows: 5,
        }
    }
}

/// Thresholds used by [`CacheAdvisor`](crate::cache::CacheAdvisor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheThresholds {
    /// Region hit ratio below which tuning is recommended.
    pub region_min_hit_ratio: f64,
    /// Element count in memory above which off-heap storage is recommended.
    pub region_max_elements: u64,
    /// Query cache hit ratio below which the query cache is questioned.
    pub query_cache_min_hit_ratio: f64,
    /// Overall L2 hit ratio below which the monitor logs a warning.
    pub l2_warn_hit_ratio: f64,
}

impl Default for CacheThresholds {
    fn default() -> Self {
        Self {
            region_min_hit_ratio: 0.5,
            region_max_elements: 10_000,
            query_cache_min_hit_ratio: 0.3,
            l2_warn_hit_ratio: 0.7,
        }
    }
}

/// Periodic cache monitor schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between two evaluations. The first one runs immediately.
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Bounded query log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLogConfig {
    /// Whether recorded queries are forwarded to the log.
    pub enabled: bool,
    /// Maximum number of undrained entries. Overflow is dropped and counted.
    pub capacity: usize,
}

impl Default for QueryLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 1024,
        }
    }
}

/// Top-level advisor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub detector: DetectorThresholds,
    pub cache: CacheThresholds,
    pub monitor: MonitorConfig,
    pub query_log: QueryLogConfig,
}

impl AdvisorConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, AdvisorError> {
        let config: AdvisorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AdvisorError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), AdvisorError> {
        if self.monitor.interval_secs == 0 {
            return Err(AdvisorError::InvalidConfiguration(
                "monitor.interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.query_log.enabled && self.query_log.capacity == 0 {
            return Err(AdvisorError::InvalidConfiguration(
                "query_log.capacity must be greater than 0 when the log is enabled".to_string(),
            ));
        }

        let ratios = [
            ("cache.region_min_hit_ratio", self.cache.region_min_hit_ratio),
            ("cache.query_cache_min_hit_ratio", self.cache.query_cache_min_hit_ratio),
            ("cache.l2_warn_hit_ratio", self.cache.l2_warn_hit_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(AdvisorError::InvalidConfiguration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        Ok(())
    }
}
