// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance problem detection.
//!
//! Four independent checks run over a session snapshot and never
//! short-circuit each other:
//!
//! | Check | Condition (per key) | Severity |
//! |---|---|---|
//! | repeated small query | `count > 3 && avg_rows < 2` | HIGH |
//! | slow query | `avg_time > 100ms` | HIGH |
//! | large result set | `max_rows > 1000` | MEDIUM |
//! | inefficient frequent query | `count > 50 && avg_rows < 5` | MEDIUM |
//!
//! The repeated small query check additionally evaluates the session totals
//! against six overlapping [`SessionTrigger`]s. They are kept as separate,
//! individually reportable conditions; together they are known to
//! over-report small sessions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::collector::{MonitoringSession, QueryExecution};
use crate::config::DetectorThresholds;
use crate::normalizer::extract_entity_name;
use crate::Severity;

/// Entity reported for session-level findings.
pub const SESSION_ENTITY: &str = "session";

/// Query text reported for session-level findings.
pub const SESSION_QUERY: &str = "Multiple queries detected";

/// Classification of a detected problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemType {
    /// Many executions each returning very few rows (N+1).
    RepeatedSmallQuery,
    SlowQuery,
    LargeResultSet,
    InefficientFrequentQuery,
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemType::RepeatedSmallQuery => write!(f, "REPEATED_SMALL_QUERY"),
            ProblemType::SlowQuery => write!(f, "SLOW_QUERY"),
            ProblemType::LargeResultSet => write!(f, "LARGE_RESULT_SET"),
            ProblemType::InefficientFrequentQuery => write!(f, "INEFFICIENT_FREQUENT_QUERY"),
        }
    }
}

/// One finding. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProblem {
    pub problem_type: ProblemType,
    /// Best-effort entity or table name.
    pub entity: String,
    /// Offending query text.
    pub query: String,
    /// Observed execution count.
    pub query_count: u64,
    pub description: String,
    pub severity: Severity,
}

impl PerformanceProblem {
    fn for_execution(
        problem_type: ProblemType,
        exec: &QueryExecution,
        description: String,
        severity: Severity,
    ) -> Self {
        Self {
            problem_type,
            entity: extract_entity_name(&exec.query),
            query: exec.query.clone(),
            query_count: exec.execution_count(),
            description,
            severity,
        }
    }
}

/// Result of analyzing one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Session-relative queries executed (Q).
    pub total_queries: u64,
    /// Session-relative entities loaded (E).
    pub total_entities: u64,
    /// Session-level triggers that fired, in evaluation order.
    pub session_triggers: Vec<SessionTrigger>,
    pub problems: Vec<PerformanceProblem>,
}

impl PerformanceReport {
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Problems of one type, in report order.
    pub fn problems_by_type(&self, problem_type: ProblemType) -> Vec<&PerformanceProblem> {
        self.problems
            .iter()
            .filter(|p| p.problem_type == problem_type)
            .collect()
    }
}

/// Session-level repeated small query conditions over `Q` (queries), `E`
/// (entities) and `avg = E > 0 ? max(1, E / max(1, Q)) : 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionTrigger {
    /// `Q > min_executions && avg < max_avg_rows`
    ManyQueriesFewRows,
    /// `Q > 2 && E > 0 && Q > E + 1`
    QueriesExceedEntitiesPlusOne,
    /// `Q > 2 && avg < 3`
    SeveralQueriesLowAverage,
    /// `Q >= 3 && E == 0`
    QueriesWithoutEntities,
    /// `Q >= 2 && E > 0 && Q > E`
    QueriesExceedEntities,
    /// `Q >= 2 && avg <= 1`
    SingleRowAverage,
}

impl SessionTrigger {
    pub const ALL: [SessionTrigger; 6] = [
        SessionTrigger::ManyQueriesFewRows,
        SessionTrigger::QueriesExceedEntitiesPlusOne,
        SessionTrigger::SeveralQueriesLowAverage,
        SessionTrigger::QueriesWithoutEntities,
        SessionTrigger::QueriesExceedEntities,
        SessionTrigger::SingleRowAverage,
    ];

    /// Average rows per query as the session-level check computes it.
    pub fn average_rows(queries: u64, entities: u64) -> u64 {
        if entities > 0 {
            (entities / queries.max(1)).max(1)
        } else {
            1
        }
    }

    /// Whether this trigger fires for the given totals.
    pub fn fires(self, queries: u64, entities: u64, thresholds: &DetectorThresholds) -> bool {
        let (q, e) = (queries, entities);
        let avg = Self::average_rows(q, e);
        match self {
            SessionTrigger::ManyQueriesFewRows => {
                q > thresholds.repeated_query_min_executions
                    && avg < thresholds.repeated_query_max_avg_rows
            }
            SessionTrigger::QueriesExceedEntitiesPlusOne => q > 2 && e > 0 && q > e + 1,
            SessionTrigger::SeveralQueriesLowAverage => q > 2 && avg < 3,
            SessionTrigger::QueriesWithoutEntities => q >= 3 && e == 0,
            SessionTrigger::QueriesExceedEntities => q >= 2 && e > 0 && q > e,
            SessionTrigger::SingleRowAverage => q >= 2 && avg <= 1,
        }
    }

    /// Every trigger that fires, in declaration order. Empty when `Q == 0`.
    pub fn evaluate(queries: u64, entities: u64, thresholds: &DetectorThresholds) -> Vec<Self> {
        if queries == 0 {
            return Vec::new();
        }
        Self::ALL
            .into_iter()
            .filter(|t| t.fires(queries, entities, thresholds))
            .collect()
    }
}

impl fmt::Display for SessionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionTrigger::ManyQueriesFewRows => "many_queries_few_rows",
            SessionTrigger::QueriesExceedEntitiesPlusOne => "queries_exceed_entities_plus_one",
            SessionTrigger::SeveralQueriesLowAverage => "several_queries_low_average",
            SessionTrigger::QueriesWithoutEntities => "queries_without_entities",
            SessionTrigger::QueriesExceedEntities => "queries_exceed_entities",
            SessionTrigger::SingleRowAverage => "single_row_average",
        };
        f.write_str(name)
    }
}

/// Rule-based classifier over session statistics.
#[derive(Debug, Clone, Default)]
pub struct ProblemDetector {
    thresholds: DetectorThresholds,
}

impl ProblemDetector {
    pub fn new(thresholds: DetectorThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &DetectorThresholds {
        &self.thresholds
    }

    /// Run all four checks over the session's current statistics.
    pub fn analyze(&self, session: &MonitoringSession) -> PerformanceReport {
        let executions = session.snapshot();
        let total_queries = session.total_queries_executed();
        let total_entities = session.total_entities_loaded();

        debug!(
            session = %session.id(),
            total_queries,
            total_entities,
            distinct_queries = executions.len(),
            "Analyzing session"
        );

        let mut problems = Vec::new();
        let session_triggers =
            self.detect_repeated_small_queries(&executions, total_queries, total_entities, &mut problems);
        self.detect_slow_queries(&executions, &mut problems);
        self.detect_large_result_sets(&executions, &mut problems);
        self.detect_inefficient_frequent_queries(&executions, &mut problems);

        if !problems.is_empty() {
            info!(
                session = %session.id(),
                problems = problems.len(),
                total_queries,
                total_entities,
                "Performance problems detected"
            );
        }

        PerformanceReport {
            session_id: session.id(),
            generated_at: Utc::now(),
            total_queries,
            total_entities,
            session_triggers,
            problems,
        }
    }

    fn detect_repeated_small_queries(
        &self,
        executions: &[QueryExecution],
        total_queries: u64,
        total_entities: u64,
        problems: &mut Vec<PerformanceProblem>,
    ) -> Vec<SessionTrigger> {
        let t = &self.thresholds;
        for exec in executions {
            if exec.execution_count() > t.repeated_query_min_executions
                && exec.avg_row_count() < t.repeated_query_max_avg_rows
            {
                problems.push(PerformanceProblem::for_execution(
                    ProblemType::RepeatedSmallQuery,
                    exec,
                    format!(
                        "Query executed {} times with avg {} rows",
                        exec.execution_count(),
                        exec.avg_row_count()
                    ),
                    Severity::High,
                ));
            }
        }

        let triggers = SessionTrigger::evaluate(total_queries, total_entities, t);
        let avg = SessionTrigger::average_rows(total_queries, total_entities);
        debug!(
            total_queries,
            total_entities,
            avg_rows_per_query = avg,
            fired = triggers.len(),
            "Session-level repeated query evaluation"
        );

        if !triggers.is_empty() {
            let names: Vec<String> = triggers.iter().map(ToString::to_string).collect();
            info!(
                total_queries,
                total_entities,
                triggers = %names.join(","),
                "Repeated small query pattern detected at session level"
            );
            problems.push(PerformanceProblem {
                problem_type: ProblemType::RepeatedSmallQuery,
                entity: SESSION_ENTITY.to_string(),
                query: SESSION_QUERY.to_string(),
                query_count: total_queries,
                description: format!(
                    "Detected {total_queries} queries loading {total_entities} entities \
                     (avg {avg} rows per query). This suggests a repeated small query pattern."
                ),
                severity: Severity::High,
            });
        }

        triggers
    }

    fn detect_slow_queries(&self, executions: &[QueryExecution], problems: &mut Vec<PerformanceProblem>) {
        for exec in executions {
            if exec.avg_execution_time() > self.thresholds.slow_query_ms {
                problems.push(PerformanceProblem::for_execution(
                    ProblemType::SlowQuery,
                    exec,
                    format!("Average execution time: {}ms", exec.avg_execution_time()),
                    Severity::High,
                ));
            }
        }
    }

    fn detect_large_result_sets(
        &self,
        executions: &[QueryExecution],
        problems: &mut Vec<PerformanceProblem>,
    ) {
        for exec in executions {
            if exec.max_row_count() > self.thresholds.large_result_set_rows {
                problems.push(PerformanceProblem::for_execution(
                    ProblemType::LargeResultSet,
                    exec,
                    format!("Max rows returned: {}", exec.max_row_count()),
                    Severity::Medium,
                ));
            }
        }
    }

    fn detect_inefficient_frequent_queries(
        &self,
        executions: &[QueryExecution],
        problems: &mut Vec<PerformanceProblem>,
    ) {
        let t = &self.thresholds;
        for exec in executions {
            if exec.execution_count() > t.frequent_query_min_executions
                && exec.avg_row_count() < t.frequent_query_max_avg_rows
            {
                problems.push(PerformanceProblem::for_execution(
                    ProblemType::InefficientFrequentQuery,
                    exec,
                    format!(
                        "Frequent query: {} executions with avg {} rows",
                        exec.execution_count(),
                        exec.avg_row_count()
                    ),
                    Severity::Medium,
                ));
            }
        }
    }
}
