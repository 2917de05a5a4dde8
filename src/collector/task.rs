//! Atomic units of collection work and their outcomes.

use crate::fetcher::FailureReason;
use crate::{Period, RecordPayload};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of one collection task: (region, municipality, period).
///
/// Unique by construction; the planner emits at most one task per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    /// Two-letter region code
    pub region: String,
    /// IBGE municipality code
    pub municipality: String,
    /// Calendar month
    pub period: Period,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.municipality, self.period)
    }
}

/// One atomic fetch: one municipality, one period.
///
/// Created by the planner, consumed exactly once by the orchestrator, never
/// mutated after creation. The sequence number gives stable ordering in
/// progress output and failure manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchTask {
    /// Monotonically increasing sequence number within the plan
    pub seq: u64,
    /// Two-letter region code (e.g. "PE")
    pub region_code: String,
    /// IBGE code of the region (e.g. "26")
    pub region_ibge: String,
    /// Region display name
    pub region_name: String,
    /// IBGE code of the municipality
    pub municipality_code: String,
    /// Municipality display name
    pub municipality_name: String,
    /// Calendar month to collect
    pub period: Period,
}

impl FetchTask {
    /// The task's dataset key.
    pub fn key(&self) -> TaskKey {
        TaskKey {
            region: self.region_code.clone(),
            municipality: self.municipality_code.clone(),
            period: self.period,
        }
    }
}

/// Terminal outcome of one task: a payload or a classified failure.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The task this result belongs to
    pub task: FetchTask,
    /// Payload on success, classified reason on failure
    pub outcome: Result<RecordPayload, FailureReason>,
}

impl FetchResult {
    /// Whether the task succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
