// SPDX-License-Identifier: PMPL-1.0-or-later
//! Problem type to recommendation mapping.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::detector::{PerformanceProblem, ProblemType};
use crate::Severity;

/// One actionable fix. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub strategy: String,
    pub description: String,
    /// Short illustrative snippet.
    pub example: String,
    pub severity: Severity,
}

impl Recommendation {
    fn new(strategy: &str, description: &str, example: &str, severity: Severity) -> Self {
        Self {
            strategy: strategy.to_string(),
            description: description.to_string(),
            example: example.to_string(),
            severity,
        }
    }
}

/// Stateless mapping from problems to ordered recommendations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Recommendations for each problem, in problem order. Within one problem
    /// the most impactful recommendation comes first.
    pub fn get_recommendations(&self, problems: &[PerformanceProblem]) -> Vec<Recommendation> {
        problems
            .iter()
            .flat_map(|p| Self::for_type(p.problem_type))
            .collect()
    }

    /// Fixed table for one problem type.
    pub fn for_type(problem_type: ProblemType) -> Vec<Recommendation> {
        match problem_type {
            ProblemType::RepeatedSmallQuery => vec![
                Recommendation::new(
                    "Use JOIN FETCH",
                    "Load related entities in the same round trip with JOIN FETCH",
                    "SELECT DISTINCT o FROM Order o JOIN FETCH o.customer",
                    Severity::High,
                ),
                Recommendation::new(
                    "Enable batch fetching",
                    "Fetch lazy associations in fixed-size batches",
                    "@BatchSize(size = 25)",
                    Severity::Medium,
                ),
                Recommendation::new(
                    "Use Entity Graph",
                    "Describe the required associations with an explicit fetch graph",
                    "EntityGraph<Order> graph = session.createEntityGraph(Order.class);",
                    Severity::Medium,
                ),
            ],
            ProblemType::SlowQuery => vec![
                Recommendation::new(
                    "Add indexes",
                    "Index the columns used in filters and joins",
                    "@Index(name = \"idx_order_status\", columnList = \"status\")",
                    Severity::High,
                ),
                Recommendation::new(
                    "Optimize query",
                    "Project only the needed columns instead of full entities",
                    "SELECT NEW OrderSummary(o.id, o.name) FROM Order o",
                    Severity::Medium,
                ),
            ],
            ProblemType::LargeResultSet => vec![Recommendation::new(
                "Use pagination",
                "Page through large result sets with offset and limit",
                ".setFirstResult(0).setMaxResults(50)",
                Severity::Medium,
            )],
            ProblemType::InefficientFrequentQuery => Vec::new(),
        }
    }

    /// Query rewriting is not implemented; the text is returned unchanged.
    pub fn suggest_rewrite(&self, query: &str) -> String {
        query.to_string()
    }

    /// Ranked view: first occurrence of each strategy wins, then a stable
    /// sort puts HIGH before MEDIUM before LOW.
    pub fn prioritize(&self, recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<Recommendation> = recommendations
            .into_iter()
            .filter(|r| seen.insert(r.strategy.clone()))
            .collect();
        ranked.sort_by(|a, b| b.severity.cmp(&a.severity));
        ranked
    }
}
