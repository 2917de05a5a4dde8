//! Collect command implementation

use crate::aggregate::{ConsolidatedDataset, ResultAggregator};
use crate::catalog::{RegionCatalog, RegionSelector};
use crate::collector::{
    CancelToken, CollectionOrchestrator, CollectorConfig, ProgressSnapshot, RetryPolicy,
    RunOutcome, RunSummary, Strategy, TaskPlanner,
};
use crate::fetcher::aps_http::ApsHttpClient;
use crate::output::csv::{write_dataset, write_manifest};
use crate::output::path::{
    consolidated_path, manifest_path, region_path, run_stamp, DEFAULT_DATA_DIR,
};
use crate::Period;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::CliError;

/// Maximum worker pool size accepted on the command line.
const MAX_WORKERS_ARG: usize = 32;

/// Parse and validate the worker pool size.
fn parse_workers(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("workers must be at least 1".to_string());
    }
    if value > MAX_WORKERS_ARG {
        return Err(format!("workers {value} exceeds maximum of {MAX_WORKERS_ARG}"));
    }
    Ok(value)
}

/// Parse the comma-separated period list.
fn parse_periods(input: &str) -> Result<Vec<Period>, CliError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            Period::from_str(token)
                .map_err(|e| CliError::InvalidArgument(format!("invalid period: {e}")))
        })
        .collect()
}

/// ACS Collector CLI
#[derive(Parser, Debug)]
#[command(name = "acs-collector")]
#[command(about = "Collect community health agent payment data from the APS reporting API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Data directory for collected files (default: "data")
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Total attempts per task for transient failures (default: 3, range: 1-10)
    #[arg(long, global = true, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a collection over regions and periods
    Collect(CollectArgs),

    /// List the known region directory
    Regions(super::RegionsCommand),
}

/// Execution strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// One task in flight at a time
    Sequential,
    /// Bounded worker pool
    Parallel,
}

impl FromStr for StrategyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(StrategyArg::Sequential),
            "parallel" => Ok(StrategyArg::Parallel),
            _ => Err(format!(
                "invalid strategy: {s}. Valid options: sequential, parallel"
            )),
        }
    }
}

/// Collect command arguments
#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// Comma-separated region codes (e.g. "PE,SP,BA") or "ALL"
    #[arg(long, short = 'r')]
    pub regions: String,

    /// Comma-separated periods in YYYY-MM form (e.g. "2025-05,2025-06")
    #[arg(long, short = 'p')]
    pub periods: String,

    /// Execution strategy: sequential (default) or parallel
    #[arg(long, default_value = "sequential")]
    pub strategy: StrategyArg,

    /// Worker pool size for the parallel strategy (default: 3, max: 32)
    ///
    /// Request pacing applies per worker, so the effective request rate
    /// scales with this value. Keep it small to stay polite to the service.
    #[arg(long, short = 'w', default_value = "3", value_parser = parse_workers)]
    pub workers: usize,

    /// Write only the consolidated dataset, skipping per-region files
    #[arg(long, default_value_t = false)]
    pub consolidated_only: bool,
}

impl CollectArgs {
    /// Execute the collect command end to end.
    pub async fn execute(&self, cli: &Cli, cancel: CancelToken) -> Result<RunOutcome, CliError> {
        let selector = RegionSelector::parse(&self.regions)?;
        let periods = parse_periods(&self.periods)?;
        let mut catalog = RegionCatalog::builtin();
        let client = ApsHttpClient::new();

        // Unknown codes fail here, before any network activity.
        let selected: Vec<String> = catalog
            .resolve(&selector)?
            .iter()
            .map(|r| r.code.clone())
            .collect();
        info!(
            regions = selected.len(),
            periods = periods.len(),
            "starting collection"
        );

        for code in &selected {
            let region = catalog.region(code).cloned().ok_or_else(|| {
                CliError::Preflight(format!("region {code} vanished from catalog"))
            })?;
            let municipalities = client.list_municipalities(&region).await.map_err(|reason| {
                CliError::Preflight(format!(
                    "failed to load municipality directory for {code}: {reason}"
                ))
            })?;
            if municipalities.is_empty() {
                return Err(CliError::Preflight(format!(
                    "no municipalities returned for {code}"
                )));
            }
            info!(region = %code, municipalities = municipalities.len(), "directory loaded");
            catalog.set_municipalities(code, municipalities)?;
        }

        let tasks = TaskPlanner::new(&catalog).plan(&selector, &periods)?;
        info!(tasks = tasks.len(), "collection plan ready");

        let strategy = match self.strategy {
            StrategyArg::Sequential => Strategy::Sequential,
            StrategyArg::Parallel => Strategy::BoundedParallel {
                workers: self.workers,
            },
        };
        let config = CollectorConfig {
            strategy,
            retry: RetryPolicy {
                max_attempts: cli.max_attempts,
                ..RetryPolicy::default()
            },
            ..CollectorConfig::default()
        };

        let orchestrator = CollectionOrchestrator::new(Arc::new(client), config, cancel);
        let progress_task = tokio::spawn(render_progress(orchestrator.subscribe()));

        let run = orchestrator.run(tasks).await?;
        let _ = progress_task.await;

        let dataset = ResultAggregator::aggregate(&run)?;

        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let stamp = run_stamp(run.started_at());

        let consolidated = consolidated_path(&data_dir, &stamp);
        write_dataset(&consolidated, dataset.records.iter())?;

        let manifest = manifest_path(&data_dir, &stamp);
        write_manifest(&manifest, &dataset.manifest)?;

        if !self.consolidated_only {
            for (region, records) in dataset.partition_by_region() {
                write_dataset(&region_path(&data_dir, &region, &stamp), records)?;
            }
        }

        let summary = run.summary();
        match cli.output_format {
            OutputFormat::Json => output_json(&summary, &dataset, &consolidated, &manifest),
            OutputFormat::Human => output_human(&summary, &dataset, &consolidated, &manifest),
        }
        Ok(summary.outcome())
    }
}

/// Render progress snapshots as a terminal bar until the run finishes.
async fn render_progress(mut rx: watch::Receiver<ProgressSnapshot>) {
    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::default_bar());
    while rx.changed().await.is_ok() {
        let snapshot = *rx.borrow();
        bar.set_length(snapshot.planned as u64);
        bar.set_position(snapshot.completed as u64);
        bar.set_message(format!(
            "{} succeeded, {} failed",
            snapshot.succeeded, snapshot.failed
        ));
    }
    bar.finish_and_clear();
}

/// Output format options
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

fn status_token(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Clean => "completed",
        RunOutcome::PartialFailures(_) => "completed-with-failures",
        RunOutcome::NoData => "no-data-collected",
        RunOutcome::Cancelled => "cancelled",
    }
}

/// Output the run summary as a single JSON object.
fn output_json(
    summary: &RunSummary,
    dataset: &ConsolidatedDataset,
    consolidated: &Path,
    manifest: &Path,
) {
    let output = serde_json::json!({
        "status": status_token(summary.outcome()),
        "planned": summary.planned,
        "succeeded": summary.succeeded,
        "failed": summary.failed,
        "pending": summary.pending,
        "duration_secs": summary.duration.as_secs_f64(),
        "records": dataset.records.len(),
        "consolidated_path": consolidated.display().to_string(),
        "manifest_path": manifest.display().to_string(),
    });
    println!("{}", serde_json::to_string(&output).unwrap());
}

/// Output the run summary in human-readable form.
fn output_human(
    summary: &RunSummary,
    dataset: &ConsolidatedDataset,
    consolidated: &Path,
    manifest: &Path,
) {
    match summary.outcome() {
        RunOutcome::Clean => println!("\nCollection completed successfully!"),
        RunOutcome::PartialFailures(n) => {
            println!("\nCollection completed with {n} failure(s)")
        }
        RunOutcome::NoData => println!("\nCollection completed but no data was collected"),
        RunOutcome::Cancelled => println!("\nCollection cancelled"),
    }
    println!(
        "Planned: {} | Succeeded: {} | Failed: {} | Pending: {}",
        summary.planned, summary.succeeded, summary.failed, summary.pending
    );
    println!("Duration: {:.1}s", summary.duration.as_secs_f64());
    println!("Records: {}", dataset.records.len());
    println!("Consolidated dataset: {}", consolidated.display());
    if !dataset.manifest.is_empty() {
        println!("Failure manifest: {}", manifest.display());
    }
}
