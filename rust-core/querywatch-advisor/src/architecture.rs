// SPDX-License-Identifier: PMPL-1.0-or-later
//! Architecture validation and developer guidelines.
//!
//! Checks a component-to-strategy assignment against well-known component
//! roles and produces a score in `[0, 1]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scorer::Strategy;

/// Score deducted per issue.
const ISSUE_PENALTY: f64 = 0.1;

/// Strategy chosen for each named component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationArchitecture {
    #[serde(default)]
    pub components: BTreeMap<String, Strategy>,
}

impl ApplicationArchitecture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, name: impl Into<String>, strategy: Strategy) -> Self {
        self.components.insert(name.into(), strategy);
        self
    }

    pub fn add_component(&mut self, name: impl Into<String>, strategy: Strategy) {
        self.components.insert(name.into(), strategy);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureValidationReport {
    /// 1.0 minus 0.1 per issue, never below 0.
    pub score: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ArchitectureValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_name: String,
    #[serde(default)]
    pub database_type: Option<String>,
    #[serde(default)]
    pub team_size: u32,
}

impl ProjectContext {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineSection {
    pub title: String,
    pub description: String,
    pub rules: Vec<String>,
}

impl GuidelineSection {
    fn new(title: &str, description: &str, rules: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            rules: rules.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperGuidelines {
    pub project_name: String,
    pub sections: Vec<GuidelineSection>,
}

/// Stateless architecture checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchitectureAdvisor;

impl ArchitectureAdvisor {
    pub fn new() -> Self {
        Self
    }

    /// Validate every component. Component names match case-insensitively.
    pub fn validate(&self, architecture: &ApplicationArchitecture) -> ArchitectureValidationReport {
        let mut score = 1.0_f64;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        for (name, strategy) in &architecture.components {
            match name.to_lowercase().as_str() {
                "analytics" | "reporting" if *strategy != Strategy::DirectSql => {
                    issues.push(format!("Component {name} should use direct SQL for analytics"));
                    score -= ISSUE_PENALTY;
                }
                "bulkimport" | "bulkupdate" if *strategy != Strategy::DirectSql => {
                    issues.push(format!(
                        "Component {name} should use direct SQL for batch operations"
                    ));
                    score -= ISSUE_PENALTY;
                }
                "productcatalog" | "orderprocessing" if *strategy == Strategy::DirectSql => {
                    recommendations.push(format!(
                        "Consider the ORM-mapped strategy for {name} to simplify CRUD"
                    ));
                }
                _ => {}
            }
        }

        for (name, strategy) in &architecture.components {
            match (name.to_lowercase().as_str(), strategy) {
                ("productcatalog", Strategy::OrmMapped) => {
                    recommendations.push(format!("Enable caching for {name}"));
                }
                ("bulkimport", Strategy::DirectSql) => {
                    recommendations.push(format!("Use batch operations in {name}"));
                }
                _ => {}
            }
        }

        ArchitectureValidationReport {
            score: score.max(0.0),
            issues,
            recommendations,
        }
    }

    /// Three fixed sections: when to use the ORM, when to use direct SQL,
    /// and how to combine them.
    pub fn generate_guidelines(&self, project: &ProjectContext) -> DeveloperGuidelines {
        DeveloperGuidelines {
            project_name: project.project_name.clone(),
            sections: vec![
                GuidelineSection::new(
                    "When to use the ORM",
                    "Use the ORM-mapped strategy for standard CRUD operations",
                    &[
                        "Standard CRUD operations on entities",
                        "Operations that navigate relationships between entities",
                        "When the second-level cache is needed",
                        "Simple search queries",
                    ],
                ),
                GuidelineSection::new(
                    "When to use direct SQL",
                    "Use direct SQL for complex queries and batch operations",
                    &[
                        "Complex analytical queries with window functions",
                        "Batch operations inserting or updating large volumes",
                        "Database-specific functions",
                        "Performance-critical operations",
                    ],
                ),
                GuidelineSection::new(
                    "Hybrid approach",
                    "Combine the ORM and direct SQL for optimal performance",
                    &[
                        "ORM for CRUD, direct SQL for analytics",
                        "Invalidate the cache after bulk operations run through direct SQL",
                        "Keep transactional business logic on the ORM",
                    ],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_architecture() {
        let arch = ApplicationArchitecture::new()
            .with_component("Analytics", Strategy::DirectSql)
            .with_component("ProductCatalog", Strategy::OrmMapped)
            .with_component("BulkImport", Strategy::DirectSql);

        let report = ArchitectureAdvisor::new().validate(&arch);
        assert!(report.is_valid());
        assert!((report.score - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            report.recommendations,
            vec![
                "Use batch operations in BulkImport".to_string(),
                "Enable caching for ProductCatalog".to_string(),
            ]
        );
    }

    #[test]
    fn test_misassigned_components_lose_score() {
        let arch = ApplicationArchitecture::new()
            .with_component("reporting", Strategy::OrmMapped)
            .with_component("BulkUpdate", Strategy::Hybrid);

        let report = ArchitectureAdvisor::new().validate(&arch);
        assert_eq!(report.issues.len(), 2);
        assert!((report.score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_crud_component_on_direct_sql() {
        let arch = ApplicationArchitecture::new().with_component("OrderProcessing", Strategy::DirectSql);
        let report = ArchitectureAdvisor::new().validate(&arch);
        assert!(report.is_valid());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("OrderProcessing"));
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let mut arch = ApplicationArchitecture::new();
        for base in ["Analytics", "Reporting", "BulkImport", "BulkUpdate"] {
            arch.add_component(base, Strategy::OrmMapped);
            arch.add_component(base.to_uppercase(), Strategy::OrmMapped);
            arch.add_component(base.to_lowercase(), Strategy::Hybrid);
        }
        let report = ArchitectureAdvisor::new().validate(&arch);
        assert_eq!(report.issues.len(), 12);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_unknown_components_ignored() {
        let arch = ApplicationArchitecture::new().with_component("Billing", Strategy::Hybrid);
        let report = ArchitectureAdvisor::new().validate(&arch);
        assert!(report.is_valid());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_guidelines() {
        let guidelines = ArchitectureAdvisor::new().generate_guidelines(&ProjectContext::new("shop"));
        assert_eq!(guidelines.project_name, "shop");
        assert_eq!(guidelines.sections.len(), 3);
        assert_eq!(guidelines.sections[0].rules.len(), 4);
        assert_eq!(guidelines.sections[1].rules.len(), 4);
        assert_eq!(guidelines.sections[2].rules.len(), 3);
    }

    #[test]
    fn test_architecture_from_json() {
        let arch: ApplicationArchitecture =
            serde_json::from_str(r#"{"components": {"Reporting": "DIRECT_SQL"}}"#).unwrap();
        assert_eq!(arch.components["Reporting"], Strategy::DirectSql);
    }
}
