// SPDX-License-Identifier: PMPL-1.0-or-later
//! Advisor context.
//!
//! Owns the configuration and every engine component. The top-level caller
//! opens it, passes it by reference, and closes it; there is no global state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::architecture::{
    ApplicationArchitecture, ArchitectureAdvisor, ArchitectureValidationReport,
    DeveloperGuidelines, ProjectContext,
};
use crate::cache::{CacheAdvisor, CacheSnapshot, CacheStatisticsSource, OptimizationReport};
use crate::collector::{MetricsCollector, MonitoringSession, StatisticsSource};
use crate::config::AdvisorConfig;
use crate::detector::{PerformanceReport, ProblemDetector};
use crate::error::AdvisorError;
use crate::monitor::CacheMonitor;
use crate::query_log::{LoggedQuery, QueryLog};
use crate::recommendations::{Recommendation, RecommendationEngine};
use crate::scorer::{OperationDescription, TechnologyRecommendation, TechnologyScorer};

pub struct AdvisorContext {
    config: AdvisorConfig,
    detector: ProblemDetector,
    recommendations: RecommendationEngine,
    cache: CacheAdvisor,
    scorer: TechnologyScorer,
    architecture: ArchitectureAdvisor,
    query_log: Option<QueryLog>,
}

impl AdvisorContext {
    /// Validate `config` and build every component from it. Starts the query
    /// log when it is enabled.
    pub fn open(config: AdvisorConfig) -> Result<Self, AdvisorError> {
        config.validate()?;

        let query_log = if config.query_log.enabled {
            Some(QueryLog::start(config.query_log.capacity)?)
        } else {
            None
        };

        info!(
            query_log = config.query_log.enabled,
            monitor_interval_secs = config.monitor.interval_secs,
            "Advisor context opened"
        );

        Ok(Self {
            detector: ProblemDetector::new(config.detector.clone()),
            recommendations: RecommendationEngine::new(),
            cache: CacheAdvisor::new(config.cache.clone()),
            scorer: TechnologyScorer::new(),
            architecture: ArchitectureAdvisor::new(),
            query_log,
            config,
        })
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn detector(&self) -> &ProblemDetector {
        &self.detector
    }

    pub fn cache_advisor(&self) -> &CacheAdvisor {
        &self.cache
    }

    /// A collector over `source`, forwarding to the query log when enabled.
    pub fn collector(&self, source: Arc<dyn StatisticsSource>) -> MetricsCollector {
        let collector = MetricsCollector::new(source);
        match self.query_log {
            Some(ref log) => collector.with_query_log(log.sink()),
            None => collector,
        }
    }

    pub fn analyze(&self, session: &MonitoringSession) -> PerformanceReport {
        self.detector.analyze(session)
    }

    /// Recommendations for every problem in `report`, in problem order.
    pub fn recommendations(&self, report: &PerformanceReport) -> Vec<Recommendation> {
        self.recommendations.get_recommendations(&report.problems)
    }

    /// De-duplicated recommendations, most severe first.
    pub fn ranked_recommendations(&self, report: &PerformanceReport) -> Vec<Recommendation> {
        self.recommendations
            .prioritize(self.recommendations(report))
    }

    pub fn optimize_cache(&self, snapshot: &CacheSnapshot) -> OptimizationReport {
        self.cache.optimize_cache(snapshot)
    }

    pub fn export_metrics(&self, snapshot: &CacheSnapshot) -> String {
        self.cache.export_metrics(snapshot)
    }

    pub fn recommend_technology(&self, op: &OperationDescription) -> TechnologyRecommendation {
        self.scorer.recommend(op)
    }

    pub fn validate_architecture(
        &self,
        architecture: &ApplicationArchitecture,
    ) -> ArchitectureValidationReport {
        self.architecture.validate(architecture)
    }

    pub fn guidelines(&self, project: &ProjectContext) -> DeveloperGuidelines {
        self.architecture.generate_guidelines(project)
    }

    /// A cache monitor on the configured schedule. Not started.
    pub fn cache_monitor(&self, source: Arc<dyn CacheStatisticsSource>) -> CacheMonitor {
        CacheMonitor::new(source, self.cache.clone(), self.config.monitor.clone())
    }

    /// Buffered query log entries; empty when the log is disabled.
    pub fn drain_query_log(&mut self) -> Vec<LoggedQuery> {
        self.query_log
            .as_mut()
            .map(QueryLog::drain)
            .unwrap_or_default()
    }

    /// Entries the query log rejected because it was full.
    pub fn dropped_queries(&self) -> u64 {
        self.query_log.as_ref().map_or(0, QueryLog::dropped)
    }

    /// Stop the query log and hand back whatever it still held.
    pub fn close(self) -> Vec<LoggedQuery> {
        let remaining = self.query_log.map(QueryLog::stop).unwrap_or_default();
        debug!(remaining = remaining.len(), "Advisor context closed");
        remaining
    }
}
