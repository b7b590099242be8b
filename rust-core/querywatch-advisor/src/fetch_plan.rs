// SPDX-License-Identifier: PMPL-1.0-or-later
//! Association fetch planning.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Round trips assumed for a query that loads associations lazily.
pub const ESTIMATED_LAZY_ROUND_TRIPS: u32 = 10;

/// Batch size suggested for frequently accessed small collections.
pub const RECOMMENDED_BATCH_SIZE: u32 = 25;

/// Accesses above which a small collection is worth batch fetching.
pub const FREQUENT_ACCESS_COUNT: u64 = 100;

/// Average size below which a collection counts as small.
pub const SMALL_COLLECTION_SIZE: u64 = 10;

/// Average size above which a collection counts as large.
pub const LARGE_COLLECTION_SIZE: u64 = 50;

static JOIN_FETCH: OnceLock<Regex> = OnceLock::new();

fn join_fetch() -> &'static Regex {
    JOIN_FETCH.get_or_init(|| Regex::new(r"(?i)JOIN\s+FETCH").expect("join fetch pattern is valid"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER"),
            JoinKind::Left => write!(f, "LEFT"),
        }
    }
}

/// Association path to fetch eagerly, relative to the root alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAssociation {
    pub path: String,
    #[serde(default)]
    pub join: JoinKind,
}

impl FetchAssociation {
    pub fn left(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            join: JoinKind::Left,
        }
    }

    pub fn inner(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            join: JoinKind::Inner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAnalysisReport {
    pub has_n_plus_one_risk: bool,
    pub recommendations: Vec<String>,
    pub estimated_query_count: u32,
    pub optimal_query_count: u32,
}

/// `SELECT DISTINCT e FROM <entity> e` followed by one join fetch per
/// association, in order.
pub fn build_fetch_query(entity: &str, associations: &[FetchAssociation]) -> String {
    let mut query = format!("SELECT DISTINCT e FROM {entity} e");
    for assoc in associations {
        query.push_str(&format!(" {} JOIN FETCH e.{}", assoc.join, assoc.path));
    }
    query
}

/// Flag query text that loads no association in the same round trip.
pub fn analyze_fetch(query: &str) -> FetchAnalysisReport {
    if join_fetch().is_match(query) {
        FetchAnalysisReport {
            has_n_plus_one_risk: false,
            recommendations: Vec::new(),
            estimated_query_count: 1,
            optimal_query_count: 1,
        }
    } else {
        FetchAnalysisReport {
            has_n_plus_one_risk: true,
            recommendations: vec!["Consider using JOIN FETCH to avoid N+1 queries".to_string()],
            estimated_query_count: ESTIMATED_LAZY_ROUND_TRIPS,
            optimal_query_count: 1,
        }
    }
}

/// How an association should be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStrategy {
    /// Load with the owner in one `JOIN FETCH` query.
    JoinFetch,
    /// Initialize several owners' collections per query.
    Batch,
    /// Load every owner's collection with one subquery.
    Subselect,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::JoinFetch => write!(f, "JOIN_FETCH"),
            FetchStrategy::Batch => write!(f, "BATCH"),
            FetchStrategy::Subselect => write!(f, "SUBSELECT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStrategyRecommendation {
    pub strategy: FetchStrategy,
    /// Only set for [`FetchStrategy::Batch`].
    pub batch_size: Option<u32>,
    pub explanation: String,
}

/// Pick a loading strategy from how often an association is accessed and how
/// many rows it yields on average.
///
/// Rules, first match wins:
/// - `access_count > 100 && average_result_size < 10` -> batch of 25
/// - `average_result_size > 50` -> subselect
/// - otherwise join fetch
pub fn recommend_fetch_strategy(
    access_count: u64,
    average_result_size: u64,
) -> FetchStrategyRecommendation {
    if access_count > FREQUENT_ACCESS_COUNT && average_result_size < SMALL_COLLECTION_SIZE {
        FetchStrategyRecommendation {
            strategy: FetchStrategy::Batch,
            batch_size: Some(RECOMMENDED_BATCH_SIZE),
            explanation: "Batch fetching recommended for frequently accessed small collections"
                .to_string(),
        }
    } else if average_result_size > LARGE_COLLECTION_SIZE {
        FetchStrategyRecommendation {
            strategy: FetchStrategy::Subselect,
            batch_size: None,
            explanation: "Subselect fetching recommended for large collections".to_string(),
        }
    } else {
        FetchStrategyRecommendation {
            strategy: FetchStrategy::JoinFetch,
            batch_size: None,
            explanation: "JOIN FETCH recommended for immediate access".to_string(),
        }
    }
}
