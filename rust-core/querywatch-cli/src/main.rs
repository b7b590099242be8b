// SPDX-License-Identifier: PMPL-1.0-or-later
//! QueryWatch command-line front end.
//!
//! Runs the advisory engine over recorded JSON inputs: session replays,
//! cache snapshots, architecture descriptions and single operations.

mod formatter;
mod input;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use querywatch_advisor::{
    analyze_fetch, build_fetch_query, recommend_fetch_strategy, AdvisorConfig, AdvisorContext,
    ApplicationArchitecture, CacheSnapshot, FetchAnalysisReport, FetchAssociation,
    FetchStrategyRecommendation, OperationDescription, OperationKind, ProjectContext,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use formatter::OutputFormat;
use input::{read_json, SessionInput, SnapshotFile};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// QueryWatch: data-access performance advisor.
#[derive(Parser, Debug)]
#[command(name = "querywatch", version = VERSION, about = "Data-access performance advisor")]
struct Cli {
    /// Advisor configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded session and report performance problems.
    Analyze {
        #[arg(long)]
        input: PathBuf,
    },
    /// Evaluate a cache snapshot.
    Cache {
        #[arg(long)]
        input: PathBuf,
        /// Print the flat metrics exposition instead of the report.
        #[arg(long)]
        metrics: bool,
    },
    /// Poll a cache snapshot file on the configured schedule.
    Monitor {
        #[arg(long)]
        input: PathBuf,
        /// Override the configured interval.
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many cycles.
        #[arg(long, default_value_t = 1)]
        cycles: usize,
    },
    /// Recommend a data-access strategy for one operation.
    Score {
        #[arg(long)]
        kind: OperationKind,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 0)]
        volume: u64,
        #[arg(long)]
        complex_queries: bool,
        #[arg(long)]
        batch: bool,
        #[arg(long)]
        caching: bool,
        #[arg(long)]
        explicit_transactions: bool,
    },
    /// Validate a component to strategy assignment.
    Validate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print developer guidelines.
    Guidelines {
        #[arg(long)]
        project: String,
    },
    /// Check query text for association fetching, build a fetch query, or
    /// pick a loading strategy from usage figures.
    Fetch {
        #[arg(long, required_unless_present_any = ["entity", "access_count"])]
        query: Option<String>,
        /// Root entity for a generated fetch query.
        #[arg(long, conflicts_with = "query")]
        entity: Option<String>,
        /// Association path; suffix with `:inner` for an inner join.
        #[arg(long = "association")]
        associations: Vec<String>,
        /// How often the association is accessed.
        #[arg(long, requires = "average_result_size")]
        access_count: Option<u64>,
        /// Average number of rows the association yields.
        #[arg(long, requires = "access_count")]
        average_result_size: Option<u64>,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<AdvisorConfig> {
    match path {
        Some(path) => AdvisorConfig::from_file(path)
            .with_context(|| format!("invalid configuration {}", path.display())),
        None => Ok(AdvisorConfig::default()),
    }
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", formatter::to_json(value)?),
        OutputFormat::Text => print!("{}", text()),
    }
    Ok(())
}

fn parse_association(value: &str) -> FetchAssociation {
    match value.rsplit_once(':') {
        Some((path, join)) if join.eq_ignore_ascii_case("inner") => FetchAssociation::inner(path),
        Some((path, join)) if join.eq_ignore_ascii_case("left") => FetchAssociation::left(path),
        _ => FetchAssociation::left(value),
    }
}

#[derive(Debug, Serialize)]
struct FetchOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<FetchAnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<FetchStrategyRecommendation>,
}

fn fetch_output(
    query: Option<String>,
    entity: Option<String>,
    associations: &[String],
    access_count: Option<u64>,
    average_result_size: Option<u64>,
) -> Result<FetchOutput> {
    let query = match (query, entity) {
        (Some(query), _) => Some(query),
        (None, Some(entity)) => {
            let assocs: Vec<FetchAssociation> =
                associations.iter().map(|a| parse_association(a)).collect();
            Some(build_fetch_query(&entity, &assocs))
        }
        (None, None) => None,
    };
    let strategy = match (access_count, average_result_size) {
        (Some(count), Some(size)) => Some(recommend_fetch_strategy(count, size)),
        _ => None,
    };
    if query.is_none() && strategy.is_none() {
        bail!("one of --query, --entity or --access-count is required");
    }
    Ok(FetchOutput {
        analysis: query.as_deref().map(analyze_fetch),
        query,
        strategy,
    })
}

/// Close the context, reporting query log entries nobody drained.
fn finish(ctx: AdvisorContext) -> usize {
    let remaining = ctx.close();
    if !remaining.is_empty() {
        info!(remaining = remaining.len(), "Query log closed with undrained entries");
        for entry in &remaining {
            debug!(
                session = %entry.session_id,
                query = %entry.query,
                execution_time_ms = entry.execution_time_ms,
                row_count = entry.row_count,
                "Undrained query"
            );
        }
    }
    remaining.len()
}

#[derive(Serialize)]
struct AnalysisOutput<'a> {
    report: &'a querywatch_advisor::PerformanceReport,
    recommendations: &'a [querywatch_advisor::Recommendation],
}

async fn run_monitor(
    ctx: &AdvisorContext,
    input: PathBuf,
    interval: Option<u64>,
    cycles: usize,
    format: OutputFormat,
) -> Result<()> {
    if cycles == 0 {
        bail!("--cycles must be at least 1");
    }
    let mut config = ctx.config().clone();
    if let Some(secs) = interval {
        config.monitor.interval_secs = secs;
    }
    config.validate()?;

    let (tx, mut rx) = mpsc::channel(cycles);
    let handle = querywatch_advisor::CacheMonitor::new(
        Arc::new(SnapshotFile::new(input)),
        ctx.cache_advisor().clone(),
        config.monitor.clone(),
    )
    .with_report_channel(tx)
    .start()?;

    let timeout = Duration::from_secs(config.monitor.interval_secs.saturating_mul(2).max(5));
    for cycle in 1..=cycles {
        let report = tokio::time::timeout(timeout, rx.recv())
            .await
            .context("timed out waiting for a monitor cycle")?
            .context("monitor stopped unexpectedly")?;
        info!(cycle, recommendations = report.recommendations.len(), "Monitor cycle complete");
        emit(format, &report, || formatter::optimization_text(&report))?;
    }

    handle.stop();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;
    let ctx = AdvisorContext::open(config)?;
    let format = cli.format;

    match cli.command {
        Command::Analyze { input } => {
            let session_input: SessionInput = read_json(&input)?;
            let collector = ctx.collector(session_input.statistics());
            let session = session_input.replay(&collector);
            let report = ctx.analyze(&session);
            let ranked = ctx.ranked_recommendations(&report);
            emit(
                format,
                &AnalysisOutput {
                    report: &report,
                    recommendations: &ranked,
                },
                || formatter::analysis_text(&report, &ranked),
            )?;
        }
        Command::Cache { input, metrics } => {
            let snapshot: CacheSnapshot = read_json(&input)?;
            if metrics {
                print!("{}", ctx.export_metrics(&snapshot));
            } else {
                let report = ctx.optimize_cache(&snapshot);
                emit(format, &report, || formatter::optimization_text(&report))?;
            }
        }
        Command::Monitor {
            input,
            interval,
            cycles,
        } => {
            run_monitor(&ctx, input, interval, cycles, format).await?;
        }
        Command::Score {
            kind,
            name,
            volume,
            complex_queries,
            batch,
            caching,
            explicit_transactions,
        } => {
            let mut op = OperationDescription::new(kind)
                .with_expected_volume(volume)
                .with_complex_queries(complex_queries)
                .with_batch_operations(batch)
                .with_caching(caching)
                .with_explicit_transaction_control(explicit_transactions);
            if let Some(name) = name {
                op = op.with_name(name);
            }
            let rec = ctx.recommend_technology(&op);
            emit(format, &rec, || formatter::technology_text(&rec))?;
        }
        Command::Validate { input } => {
            let architecture: ApplicationArchitecture = read_json(&input)?;
            let report = ctx.validate_architecture(&architecture);
            emit(format, &report, || formatter::validation_text(&report))?;
        }
        Command::Guidelines { project } => {
            let guidelines = ctx.guidelines(&ProjectContext::new(project));
            emit(format, &guidelines, || formatter::guidelines_text(&guidelines))?;
        }
        Command::Fetch {
            query,
            entity,
            associations,
            access_count,
            average_result_size,
        } => {
            let output = fetch_output(
                query,
                entity,
                &associations,
                access_count,
                average_result_size,
            )?;
            emit(format, &output, || {
                let mut text = String::new();
                if let (Some(query), Some(analysis)) = (&output.query, &output.analysis) {
                    text.push_str(&formatter::fetch_text(query, analysis));
                }
                if let Some(ref strategy) = output.strategy {
                    text.push_str(&formatter::fetch_strategy_text(strategy));
                }
                text
            })?;
        }
    }

    finish(ctx);
    Ok(())
}
