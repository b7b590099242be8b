// SPDX-License-Identifier: PMPL-1.0-or-later
//! Output formatters for advisor reports.
//!
//! - **Text**: human-readable tables using `comfy-table`.
//! - **JSON**: pretty-printed serde output of the report structs.

use std::fmt;

use comfy_table::{Cell, ContentArrangement, Table};
use querywatch_advisor::{
    ArchitectureValidationReport, DeveloperGuidelines, FetchAnalysisReport,
    FetchStrategyRecommendation, OptimizationReport, PerformanceReport, Recommendation,
    TechnologyRecommendation,
};
use serde::Serialize;

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown format '{other}'. Valid formats: text, json")),
        }
    }
}

/// Pretty-print any report as JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn plural(n: usize, word: &str) -> String {
    format!("{n} {word}{}", if n == 1 { "" } else { "s" })
}

/// Session totals, the problem table and the ranked recommendations.
pub fn analysis_text(report: &PerformanceReport, recommendations: &[Recommendation]) -> String {
    let mut out = format!(
        "Session {}\nQueries executed: {}  Entities loaded: {}\n",
        report.session_id, report.total_queries, report.total_entities
    );

    if !report.session_triggers.is_empty() {
        let names: Vec<String> = report.session_triggers.iter().map(ToString::to_string).collect();
        out.push_str(&format!("Session triggers: {}\n", names.join(", ")));
    }

    if report.problems.is_empty() {
        out.push_str("\nNo problems detected.\n");
        return out;
    }

    let mut problems = table();
    problems.set_header(vec!["Severity", "Type", "Entity", "Count", "Description"]);
    for p in &report.problems {
        problems.add_row(vec![
            Cell::new(p.severity),
            Cell::new(p.problem_type),
            Cell::new(&p.entity),
            Cell::new(p.query_count),
            Cell::new(&p.description),
        ]);
    }
    out.push_str(&format!("\n{problems}\n({})\n", plural(report.problems.len(), "problem")));

    if !recommendations.is_empty() {
        out.push_str(&format!("\n{}\n", recommendations_text(recommendations)));
    }
    out
}

pub fn recommendations_text(recommendations: &[Recommendation]) -> String {
    let mut t = table();
    t.set_header(vec!["Severity", "Strategy", "Description", "Example"]);
    for r in recommendations {
        t.add_row(vec![
            Cell::new(r.severity),
            Cell::new(&r.strategy),
            Cell::new(&r.description),
            Cell::new(&r.example),
        ]);
    }
    t.to_string()
}

pub fn optimization_text(report: &OptimizationReport) -> String {
    if !report.has_issues {
        return "No cache issues found.\n".to_string();
    }
    let mut out = String::new();
    for (i, rec) in report.recommendations.iter().enumerate() {
        out.push_str(&format!("{}. {rec}\n", i + 1));
    }
    out
}

pub fn technology_text(rec: &TechnologyRecommendation) -> String {
    let mut t = table();
    t.set_header(vec!["Field", "Value"]);
    t.add_row(vec![Cell::new("Operation"), Cell::new(&rec.operation)]);
    t.add_row(vec![Cell::new("Strategy"), Cell::new(rec.strategy)]);
    t.add_row(vec![
        Cell::new("Confidence"),
        Cell::new(format!("{:.1}", rec.confidence)),
    ]);
    t.add_row(vec![
        Cell::new("Points (ORM / SQL)"),
        Cell::new(format!("{} / {}", rec.orm_points, rec.sql_points)),
    ]);
    t.add_row(vec![Cell::new("Rationale"), Cell::new(&rec.rationale)]);

    let mut out = format!("{t}\n");
    for reason in &rec.reasons {
        out.push_str(&format!("  + {reason}\n"));
    }
    for warning in &rec.warnings {
        out.push_str(&format!("  ! {warning}\n"));
    }
    out
}

pub fn validation_text(report: &ArchitectureValidationReport) -> String {
    let mut out = format!("Score: {:.2}\n", report.score);
    if !report.issues.is_empty() {
        out.push_str("Issues:\n");
        for issue in &report.issues {
            out.push_str(&format!("  - {issue}\n"));
        }
    }
    if !report.recommendations.is_empty() {
        out.push_str("Recommendations:\n");
        for rec in &report.recommendations {
            out.push_str(&format!("  - {rec}\n"));
        }
    }
    out
}

pub fn guidelines_text(guidelines: &DeveloperGuidelines) -> String {
    let mut out = format!("Guidelines for {}\n", guidelines.project_name);
    for section in &guidelines.sections {
        out.push_str(&format!("\n## {}\n{}\n", section.title, section.description));
        for rule in &section.rules {
            out.push_str(&format!("  - {rule}\n"));
        }
    }
    out
}

pub fn fetch_text(query: &str, report: &FetchAnalysisReport) -> String {
    let mut out = format!("Query: {query}\n");
    out.push_str(&format!(
        "N+1 risk: {}\nEstimated round trips: {} (optimal {})\n",
        if report.has_n_plus_one_risk { "yes" } else { "no" },
        report.estimated_query_count,
        report.optimal_query_count
    ));
    for rec in &report.recommendations {
        out.push_str(&format!("  - {rec}\n"));
    }
    out
}

pub fn fetch_strategy_text(rec: &FetchStrategyRecommendation) -> String {
    let mut out = format!("Fetch strategy: {}", rec.strategy);
    if let Some(size) = rec.batch_size {
        out.push_str(&format!(" (batch size {size})"));
    }
    out.push_str(&format!("\n  {}\n", rec.explanation));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use querywatch_advisor::{analyze_fetch, recommend_fetch_strategy, OptimizationReport};

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_optimization_text() {
        assert_eq!(
            optimization_text(&OptimizationReport::new()),
            "No cache issues found.\n"
        );
        let mut report = OptimizationReport::new();
        report.add_recommendation("first");
        report.add_recommendation("second");
        assert_eq!(optimization_text(&report), "1. first\n2. second\n");
    }

    #[test]
    fn test_fetch_text() {
        let text = fetch_text("SELECT o FROM Order o", &analyze_fetch("SELECT o FROM Order o"));
        assert!(text.contains("N+1 risk: yes"));
        assert!(text.contains("Estimated round trips: 10 (optimal 1)"));
    }

    #[test]
    fn test_fetch_strategy_text() {
        assert_eq!(
            fetch_strategy_text(&recommend_fetch_strategy(200, 2)),
            "Fetch strategy: BATCH (batch size 25)\n  Batch fetching recommended for frequently accessed small collections\n"
        );
        assert!(fetch_strategy_text(&recommend_fetch_strategy(1, 1))
            .starts_with("Fetch strategy: JOIN_FETCH\n"));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "problem"), "1 problem");
        assert_eq!(plural(3, "problem"), "3 problems");
    }
}
