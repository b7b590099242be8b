// SPDX-License-Identifier: PMPL-1.0-or-later
//! Technology choice scoring.
//!
//! Two point totals compete: `orm_points` favor the ORM-mapped strategy,
//! `sql_points` favor direct SQL. Rules are applied in a fixed order and every
//! rule that fires contributes one reason, so the outcome is deterministic
//! and explainable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// Confidence attached to a clear winner.
pub const DECISIVE_CONFIDENCE: f64 = 0.8;

/// Confidence attached to a tie.
pub const HYBRID_CONFIDENCE: f64 = 0.6;

/// Volume above which direct SQL gains a point.
pub const HIGH_VOLUME_THRESHOLD: u64 = 10_000;

/// Closed set of operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Crud,
    Analytics,
    Batch,
    Search,
    Transaction,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Crud => write!(f, "CRUD"),
            OperationKind::Analytics => write!(f, "ANALYTICS"),
            OperationKind::Batch => write!(f, "BATCH"),
            OperationKind::Search => write!(f, "SEARCH"),
            OperationKind::Transaction => write!(f, "TRANSACTION"),
        }
    }
}

impl FromStr for OperationKind {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crud" => Ok(OperationKind::Crud),
            "analytics" => Ok(OperationKind::Analytics),
            "batch" => Ok(OperationKind::Batch),
            "search" => Ok(OperationKind::Search),
            "transaction" => Ok(OperationKind::Transaction),
            _ => Err(AdvisorError::UnknownOperationKind(s.to_string())),
        }
    }
}

/// Data-access strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Entities mapped and managed by the ORM.
    OrmMapped,
    /// Hand-written SQL over the raw connection.
    DirectSql,
    /// Both, split by operation.
    Hybrid,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::OrmMapped => write!(f, "ORM_MAPPED"),
            Strategy::DirectSql => write!(f, "DIRECT_SQL"),
            Strategy::Hybrid => write!(f, "HYBRID"),
        }
    }
}

impl FromStr for Strategy {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "orm_mapped" | "orm" => Ok(Strategy::OrmMapped),
            "direct_sql" | "sql" => Ok(Strategy::DirectSql),
            "hybrid" => Ok(Strategy::Hybrid),
            _ => Err(AdvisorError::UnknownStrategy(s.to_string())),
        }
    }
}

/// What an operation needs from the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescription {
    pub name: String,
    pub kind: OperationKind,
    #[serde(default)]
    pub expected_volume: u64,
    #[serde(default)]
    pub requires_complex_queries: bool,
    #[serde(default)]
    pub requires_batch_operations: bool,
    #[serde(default)]
    pub requires_caching: bool,
    #[serde(default)]
    pub requires_explicit_transaction_control: bool,
}

impl OperationDescription {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            name: kind.to_string().to_lowercase(),
            kind,
            expected_volume: 0,
            requires_complex_queries: false,
            requires_batch_operations: false,
            requires_caching: false,
            requires_explicit_transaction_control: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_expected_volume(mut self, volume: u64) -> Self {
        self.expected_volume = volume;
        self
    }

    pub fn with_complex_queries(mut self, value: bool) -> Self {
        self.requires_complex_queries = value;
        self
    }

    pub fn with_batch_operations(mut self, value: bool) -> Self {
        self.requires_batch_operations = value;
        self
    }

    pub fn with_caching(mut self, value: bool) -> Self {
        self.requires_caching = value;
        self
    }

    pub fn with_explicit_transaction_control(mut self, value: bool) -> Self {
        self.requires_explicit_transaction_control = value;
        self
    }
}

/// Scoring outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyRecommendation {
    pub operation: String,
    pub strategy: Strategy,
    pub rationale: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// One entry per fired rule, in firing order.
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
    pub orm_points: u32,
    pub sql_points: u32,
}

#[derive(Default)]
struct Tally {
    orm_points: u32,
    sql_points: u32,
    reasons: Vec<String>,
}

impl Tally {
    fn orm(&mut self, points: u32, reason: &str) {
        self.orm_points += points;
        self.reasons.push(reason.to_string());
    }

    fn sql(&mut self, points: u32, reason: &str) {
        self.sql_points += points;
        self.reasons.push(reason.to_string());
    }
}

/// Stateless rule-based scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TechnologyScorer;

impl TechnologyScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn recommend(&self, op: &OperationDescription) -> TechnologyRecommendation {
        let mut tally = Tally::default();

        match op.kind {
            OperationKind::Crud => tally.orm(3, "CRUD operations fit the ORM's entity lifecycle"),
            OperationKind::Analytics => tally.sql(3, "Analytics needs hand-tuned SQL"),
            OperationKind::Batch => tally.sql(3, "Batch operations are cheaper over direct SQL"),
            OperationKind::Search if op.requires_complex_queries => {
                tally.sql(2, "Complex search queries need direct SQL")
            }
            OperationKind::Search => tally.orm(2, "Simple search fits the ORM's query API"),
            OperationKind::Transaction if op.requires_explicit_transaction_control => {
                tally.sql(2, "Precise transaction control needs direct SQL")
            }
            OperationKind::Transaction => {
                tally.orm(2, "Standard transactions are handled by the ORM")
            }
        }

        if op.requires_complex_queries {
            tally.sql(2, "Complex queries favor direct SQL");
        }
        if op.requires_batch_operations {
            tally.sql(2, "Batch operations favor direct SQL");
        }
        if op.requires_caching {
            tally.orm(2, "The ORM provides second-level caching out of the box");
        }
        if op.expected_volume > HIGH_VOLUME_THRESHOLD {
            tally.sql(1, "High volume favors direct SQL");
        }

        let mut warnings = Vec::new();
        let (strategy, confidence, rationale) = if tally.orm_points > tally.sql_points {
            (
                Strategy::OrmMapped,
                DECISIVE_CONFIDENCE,
                "The ORM-mapped strategy is recommended for this operation",
            )
        } else if tally.sql_points > tally.orm_points {
            (
                Strategy::DirectSql,
                DECISIVE_CONFIDENCE,
                "Direct SQL is recommended for this operation",
            )
        } else {
            warnings.push("Consider combining both approaches".to_string());
            (
                Strategy::Hybrid,
                HYBRID_CONFIDENCE,
                "A hybrid approach may be optimal",
            )
        };

        TechnologyRecommendation {
            operation: op.name.clone(),
            strategy,
            rationale: rationale.to_string(),
            confidence,
            reasons: tally.reasons,
            warnings,
            orm_points: tally.orm_points,
            sql_points: tally.sql_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crud_with_caching() {
        let op = OperationDescription::new(OperationKind::Crud).with_caching(true);
        let rec = TechnologyScorer::new().recommend(&op);
        assert_eq!(rec.strategy, Strategy::OrmMapped);
        assert!((rec.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(rec.reasons.len(), 2);
        assert_eq!(rec.orm_points, 5);
        assert_eq!(rec.sql_points, 0);
        assert!(rec.warnings.is_empty());
    }

    #[test]
    fn test_tie_is_hybrid() {
        let op = OperationDescription::new(OperationKind::Transaction).with_batch_operations(true);
        let rec = TechnologyScorer::new().recommend(&op);
        assert_eq!(rec.orm_points, 2);
        assert_eq!(rec.sql_points, 2);
        assert_eq!(rec.strategy, Strategy::Hybrid);
        assert!((rec.confidence - 0.6).abs() < f64::EPSILON);
        assert!(!rec.warnings.is_empty());
    }

    #[test]
    fn test_analytics_high_volume() {
        let op = OperationDescription::new(OperationKind::Analytics)
            .with_complex_queries(true)
            .with_expected_volume(50_000);
        let rec = TechnologyScorer::new().recommend(&op);
        assert_eq!(rec.strategy, Strategy::DirectSql);
        assert_eq!(rec.sql_points, 6);
        assert_eq!(rec.reasons.len(), 3);
    }

    #[test]
    fn test_volume_threshold_is_strict() {
        let at = OperationDescription::new(OperationKind::Batch).with_expected_volume(10_000);
        assert_eq!(TechnologyScorer::new().recommend(&at).sql_points, 3);
        let above = at.with_expected_volume(10_001);
        assert_eq!(TechnologyScorer::new().recommend(&above).sql_points, 4);
    }

    #[test]
    fn test_search_depends_on_complexity() {
        let scorer = TechnologyScorer::new();
        let simple = scorer.recommend(&OperationDescription::new(OperationKind::Search));
        assert_eq!(simple.strategy, Strategy::OrmMapped);
        assert_eq!(simple.orm_points, 2);

        let complex = scorer
            .recommend(&OperationDescription::new(OperationKind::Search).with_complex_queries(true));
        assert_eq!(complex.strategy, Strategy::DirectSql);
        // Kind rule and flag rule both fire.
        assert_eq!(complex.sql_points, 4);
        assert_eq!(complex.reasons.len(), 2);
    }

    #[test]
    fn test_reasons_in_firing_order() {
        let op = OperationDescription::new(OperationKind::Crud)
            .with_batch_operations(true)
            .with_caching(true);
        let rec = TechnologyScorer::new().recommend(&op);
        assert!(rec.reasons[0].starts_with("CRUD"));
        assert!(rec.reasons[1].starts_with("Batch"));
        assert!(rec.reasons[2].contains("caching"));
    }

    #[test]
    fn test_parse_kind_and_strategy() {
        assert_eq!("crud".parse::<OperationKind>().unwrap(), OperationKind::Crud);
        assert_eq!("TRANSACTION".parse::<OperationKind>().unwrap(), OperationKind::Transaction);
        assert!(matches!(
            "stream".parse::<OperationKind>(),
            Err(AdvisorError::UnknownOperationKind(_))
        ));

        assert_eq!("ORM_MAPPED".parse::<Strategy>().unwrap(), Strategy::OrmMapped);
        assert_eq!("direct-sql".parse::<Strategy>().unwrap(), Strategy::DirectSql);
        assert!(matches!(
            "nosql".parse::<Strategy>(),
            Err(AdvisorError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_strategy_serde() {
        assert_eq!(serde_json::to_string(&Strategy::DirectSql).unwrap(), "\"DIRECT_SQL\"");
        let op: OperationDescription =
            serde_json::from_str(r#"{"name": "report", "kind": "ANALYTICS"}"#).unwrap();
        assert_eq!(op.kind, OperationKind::Analytics);
        assert!(!op.requires_caching);
    }
}
