// SPDX-License-Identifier: PMPL-1.0-or-later
//! QueryWatch Advisor
//!
//! Data-access performance advisory engine. Observes query executions issued
//! through an ORM, groups them by canonical query shape, classifies recurring
//! access patterns (N+1 storms, slow queries, oversized result sets, cache
//! regions that do not pay off) and turns them into ranked recommendations.
//! A stateless scorer also suggests whether an operation is better served by
//! the ORM or by direct SQL.
//!
//! The persistence runtime is an external collaborator: it feeds
//! `(query, time, rows)` observations into a [`MetricsCollector`] and exposes
//! its global counters through [`StatisticsSource`] and
//! [`CacheStatisticsSource`].

pub mod architecture;
pub mod association;
pub mod cache;
pub mod collector;
pub mod config;
pub mod context;
pub mod detector;
pub mod error;
pub mod fetch_plan;
pub mod monitor;
pub mod normalizer;
pub mod query_log;
pub mod recommendations;
pub mod scorer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use architecture::{
    ApplicationArchitecture, ArchitectureAdvisor, ArchitectureValidationReport,
    DeveloperGuidelines, GuidelineSection, ProjectContext,
};
pub use association::{link_all, unlink_all, Association};
pub use cache::{
    hit_ratio, CacheAdvisor, CacheGauges, CacheRegionStats, CacheSnapshot,
    CacheStatisticsSource, OptimizationReport,
};
pub use collector::{
    InMemoryStatistics, MetricsCollector, MonitoringSession, QueryExecution, StatisticsSource,
};
pub use config::{AdvisorConfig, CacheThresholds, DetectorThresholds, MonitorConfig, QueryLogConfig};
pub use context::AdvisorContext;
pub use detector::{PerformanceProblem, PerformanceReport, ProblemDetector, ProblemType, SessionTrigger};
pub use error::AdvisorError;
pub use fetch_plan::{
    analyze_fetch, build_fetch_query, recommend_fetch_strategy, FetchAnalysisReport,
    FetchAssociation, FetchStrategy, FetchStrategyRecommendation, JoinKind,
};
pub use monitor::{CacheMonitor, CacheMonitorHandle};
pub use normalizer::{extract_entity_name, normalize};
pub use query_log::{LoggedQuery, QueryLog, QueryLogSink};
pub use recommendations::{Recommendation, RecommendationEngine};
pub use scorer::{
    OperationDescription, OperationKind, Strategy, TechnologyRecommendation, TechnologyScorer,
};

/// How urgently a finding should be acted on.
///
/// Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// All severities, most urgent first.
    pub const ALL: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

impl FromStr for Severity {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(AdvisorError::UnknownSeverity(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display_roundtrip() {
        for s in Severity::ALL {
            let parsed: Severity = s.to_string().parse().unwrap();
            assert_eq!(s, parsed);
        }
    }

    #[test]
    fn test_severity_case_insensitive_parse() {
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("Medium".parse::<Severity>().unwrap(), Severity::Medium);
    }

    #[test]
    fn test_unknown_severity_error() {
        assert!(matches!(
            "critical".parse::<Severity>(),
            Err(AdvisorError::UnknownSeverity(_))
        ));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"HIGH\"");
        let parsed: Severity = serde_json::from_str("\"LOW\"").unwrap();
        assert_eq!(parsed, Severity::Low);
    }
}
