// SPDX-License-Identifier: PMPL-1.0-or-later
//! Second-level and query cache advice.
//!
//! [`CacheAdvisor`] turns a [`CacheSnapshot`] into free-text
//! recommendations and renders the flat `<name> <value>` metrics document.
//! [`CacheGauges`] mirrors the headline ratios into a Prometheus registry.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use prometheus::{Gauge, IntGauge, Registry};
use serde::{Deserialize, Serialize};

use crate::config::CacheThresholds;
use crate::error::AdvisorError;

/// Counters of one named cache region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheRegionStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub element_count_in_memory: u64,
}

impl CacheRegionStats {
    pub fn hit_ratio(&self) -> f64 {
        hit_ratio(self.hits, self.misses)
    }
}

/// Point-in-time cache counters reported by the persistence runtime.
///
/// Absent counters deserialize as zero. An absent `statistics_enabled` flag
/// reads as enabled, so a document carrying only counters is still analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSnapshot {
    pub statistics_enabled: bool,
    /// Regions by name.
    pub regions: BTreeMap<String, CacheRegionStats>,
    pub l2_hits: u64,
    pub l2_misses: u64,
    pub l2_puts: u64,
    pub query_cache_hits: u64,
    pub query_cache_misses: u64,
    pub query_cache_puts: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub transactions: u64,
    pub entities_loaded: u64,
    pub entities_fetched: u64,
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self {
            statistics_enabled: true,
            regions: BTreeMap::new(),
            l2_hits: 0,
            l2_misses: 0,
            l2_puts: 0,
            query_cache_hits: 0,
            query_cache_misses: 0,
            query_cache_puts: 0,
            sessions_opened: 0,
            sessions_closed: 0,
            transactions: 0,
            entities_loaded: 0,
            entities_fetched: 0,
        }
    }
}

impl CacheSnapshot {
    /// Snapshot of a runtime whose statistics are turned off.
    pub fn disabled() -> Self {
        Self {
            statistics_enabled: false,
            ..Self::default()
        }
    }

    pub fn l2_hit_ratio(&self) -> f64 {
        hit_ratio(self.l2_hits, self.l2_misses)
    }

    pub fn query_cache_hit_ratio(&self) -> f64 {
        hit_ratio(self.query_cache_hits, self.query_cache_misses)
    }
}

/// Source of cache counters, polled by [`CacheMonitor`](crate::monitor::CacheMonitor).
///
/// The monitor calls it from the blocking thread pool, so implementations
/// may read files or take locks.
pub trait CacheStatisticsSource: Send + Sync {
    fn cache_snapshot(&self) -> CacheSnapshot;
}

/// `hits / (hits + misses)`, or `0.0` when nothing was looked up.
pub fn hit_ratio(hits: u64, misses: u64) -> f64 {
    let total = hits.saturating_add(misses);
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Ordered cache recommendations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub recommendations: Vec<String>,
    /// Set on the first added recommendation.
    pub has_issues: bool,
}

impl OptimizationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_recommendation(&mut self, recommendation: impl Into<String>) {
        self.recommendations.push(recommendation.into());
        self.has_issues = true;
    }
}

/// Cache advice rules.
#[derive(Debug, Clone, Default)]
pub struct CacheAdvisor {
    thresholds: CacheThresholds,
}

impl CacheAdvisor {
    pub fn new(thresholds: CacheThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &CacheThresholds {
        &self.thresholds
    }

    /// Evaluate every region, then the query cache as a whole.
    pub fn analyze(
        &self,
        regions: &BTreeMap<String, CacheRegionStats>,
        query_cache_hits: u64,
        query_cache_misses: u64,
    ) -> OptimizationReport {
        let t = &self.thresholds;
        let mut report = OptimizationReport::new();

        for (name, stats) in regions {
            if stats.hits.saturating_add(stats.misses) > 0 {
                let ratio = stats.hit_ratio();
                if ratio < t.region_min_hit_ratio {
                    report.add_recommendation(format!(
                        "Low hit ratio ({:.2}%) for region '{name}'. Consider: \
                         1) Increasing cache size, 2) Adjusting TTL, 3) Review access patterns",
                        ratio * 100.0
                    ));
                }
            }

            if stats.element_count_in_memory > t.region_max_elements {
                report.add_recommendation(format!(
                    "Large cache size ({}) for region '{name}'. Consider: \
                     1) Enable off-heap storage, 2) Implement cache warming, 3) Use lazy loading",
                    stats.element_count_in_memory
                ));
            }
        }

        if query_cache_hits.saturating_add(query_cache_misses) > 0 {
            let ratio = hit_ratio(query_cache_hits, query_cache_misses);
            if ratio < t.query_cache_min_hit_ratio {
                report.add_recommendation(format!(
                    "Low query cache hit ratio ({:.2}%). Consider: \
                     1) Review query parameters variability, 2) Increase query cache size, \
                     3) Disable query cache for dynamic queries",
                    ratio * 100.0
                ));
            }
        }

        report
    }

    /// Full evaluation of a snapshot. With statistics disabled the only
    /// advice is to enable them.
    pub fn optimize_cache(&self, snapshot: &CacheSnapshot) -> OptimizationReport {
        if !snapshot.statistics_enabled {
            let mut report = OptimizationReport::new();
            report.add_recommendation("Enable statistics for cache optimization");
            return report;
        }
        self.analyze(
            &snapshot.regions,
            snapshot.query_cache_hits,
            snapshot.query_cache_misses,
        )
    }

    /// Flat exposition, one `<name> <value>` line per metric.
    pub fn export_metrics(&self, snapshot: &CacheSnapshot) -> String {
        let mut out = String::new();
        let counters: [(&str, u64); 3] = [
            ("cache_l2_hits_total", snapshot.l2_hits),
            ("cache_l2_misses_total", snapshot.l2_misses),
            ("cache_l2_puts_total", snapshot.l2_puts),
        ];
        for (name, value) in counters {
            let _ = writeln!(out, "{name} {value}");
        }
        let _ = writeln!(out, "cache_l2_hit_ratio {:.4}", snapshot.l2_hit_ratio());

        let counters: [(&str, u64); 3] = [
            ("cache_query_hits_total", snapshot.query_cache_hits),
            ("cache_query_misses_total", snapshot.query_cache_misses),
            ("cache_query_puts_total", snapshot.query_cache_puts),
        ];
        for (name, value) in counters {
            let _ = writeln!(out, "{name} {value}");
        }
        let _ = writeln!(out, "cache_query_hit_ratio {:.4}", snapshot.query_cache_hit_ratio());

        let counters: [(&str, u64); 5] = [
            ("sessions_opened_total", snapshot.sessions_opened),
            ("sessions_closed_total", snapshot.sessions_closed),
            ("transactions_total", snapshot.transactions),
            ("entities_loaded_total", snapshot.entities_loaded),
            ("entities_fetched_total", snapshot.entities_fetched),
        ];
        for (name, value) in counters {
            let _ = writeln!(out, "{name} {value}");
        }
        out
    }
}

/// Prometheus gauges for the headline cache figures.
#[derive(Clone)]
pub struct CacheGauges {
    l2_hit_ratio: Gauge,
    query_cache_hit_ratio: Gauge,
    recommendations: IntGauge,
}

impl CacheGauges {
    /// Create the gauges and register them with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, AdvisorError> {
        let l2_hit_ratio = Gauge::new(
            "querywatch_cache_l2_hit_ratio",
            "Second-level cache hit ratio",
        )?;
        let query_cache_hit_ratio = Gauge::new(
            "querywatch_cache_query_hit_ratio",
            "Query cache hit ratio",
        )?;
        let recommendations = IntGauge::new(
            "querywatch_cache_recommendations",
            "Outstanding cache recommendations",
        )?;

        registry.register(Box::new(l2_hit_ratio.clone()))?;
        registry.register(Box::new(query_cache_hit_ratio.clone()))?;
        registry.register(Box::new(recommendations.clone()))?;

        Ok(Self {
            l2_hit_ratio,
            query_cache_hit_ratio,
            recommendations,
        })
    }

    pub fn update(&self, snapshot: &CacheSnapshot, report: &OptimizationReport) {
        self.l2_hit_ratio.set(snapshot.l2_hit_ratio());
        self.query_cache_hit_ratio.set(snapshot.query_cache_hit_ratio());
        self.recommendations
            .set(i64::try_from(report.recommendations.len()).unwrap_or(i64::MAX));
    }
}
