//! Collection orchestration.
//!
//! This module owns the full life cycle of a collection run:
//!
//! 1. **Planning**: expand a region selector × period list into
//!    sequence-numbered tasks ([`TaskPlanner`])
//! 2. **Execution**: drive the task list sequentially or with a bounded
//!    worker pool ([`CollectionOrchestrator`]), pacing requests and retrying
//!    transient failures ([`RetryingFetcher`], [`Pacer`])
//! 3. **Accounting**: record every terminal outcome in the
//!    [`CollectionRun`], emitting monotonic progress snapshots
//!
//! A failed task never aborts a run; only pre-flight errors and invariant
//! violations do. A [`CancelToken`] lets the caller stop submission early
//! while tasks already in flight reach a terminal state.

use crate::catalog::CatalogError;

pub mod cancel;
pub mod orchestrator;
pub mod pacing;
pub mod planner;
pub mod progress;
pub mod retry;
pub mod run;
pub mod task;

pub use cancel::CancelToken;
pub use orchestrator::{CollectionOrchestrator, CollectorConfig, Strategy};
pub use pacing::Pacer;
pub use planner::{PlanError, TaskPlanner};
pub use progress::ProgressSnapshot;
pub use retry::{RetryPolicy, RetryingFetcher};
pub use run::{CollectionRun, RunOutcome, RunStatus, RunSummary, TaskState};
pub use task::{FetchResult, FetchTask, TaskKey};

/// A broken internal invariant: a defect, never an ordinary data condition.
///
/// Always aborts the run immediately, with enough context to diagnose.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invariant violation at {stage}: {detail}")]
pub struct InvariantViolation {
    /// Pipeline stage where the violation was detected
    pub stage: &'static str,
    /// Human-readable description including the offending task key
    pub detail: String,
}

impl InvariantViolation {
    /// Build a violation for the given stage.
    pub fn new(stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
        }
    }
}

/// Fatal collection errors. Per-task failures are not errors at this level;
/// they are recorded in the run and surface through the failure manifest.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Region selector could not be resolved (pre-flight)
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Task planning failed (pre-flight)
    #[error("planning error: {0}")]
    Plan(#[from] PlanError),

    /// A programming invariant was violated
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// A worker task died without reporting its results
    #[error("worker failure: {0}")]
    Worker(String),
}
