//! Consolidation of run results into ordered datasets.
//!
//! Merges every successful result into one dataset keyed by
//! (region, municipality, period) and builds the failure manifest from the
//! rest. The succeeded and failed sets always partition the executed plan;
//! anything else is an invariant violation, not a data condition.

use crate::collector::{CollectionRun, InvariantViolation, TaskKey};
use crate::fetcher::FailureReason;
use crate::RecordPayload;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// One consolidated record: the payload of a successful task plus the
/// naming context reports need.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetRecord {
    /// Plan sequence number; dataset order follows it, which is exactly
    /// (region, municipality, period) order regardless of completion order
    pub seq: u64,
    /// Dataset key
    pub key: TaskKey,
    /// Region display name
    pub region_name: String,
    /// Municipality display name
    pub municipality_name: String,
    /// Collected payload
    pub payload: RecordPayload,
}

/// One failure manifest entry.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    /// Plan sequence number
    pub seq: u64,
    /// Key of the failed task
    pub key: TaskKey,
    /// Classified failure reason
    pub reason: FailureReason,
}

/// The merged output of one run: ordered records plus the failure manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedDataset {
    /// Successful records, ordered by (region, municipality, period)
    pub records: Vec<DatasetRecord>,
    /// Every failed task and its reason, in plan order
    pub manifest: Vec<ManifestEntry>,
    /// When the dataset was assembled
    pub generated_at: DateTime<Utc>,
}

impl ConsolidatedDataset {
    /// Partition the records by region, preserving dataset order.
    ///
    /// A view over the consolidated data, not a re-fetch; used to emit one
    /// artifact per region for callers that expect them.
    pub fn partition_by_region(&self) -> Vec<(String, Vec<&DatasetRecord>)> {
        let mut partitions: Vec<(String, Vec<&DatasetRecord>)> = Vec::new();
        for record in &self.records {
            match partitions.last_mut() {
                Some((region, group)) if *region == record.key.region => group.push(record),
                _ => partitions.push((record.key.region.clone(), vec![record])),
            }
        }
        partitions
    }
}

/// Merges a finalized run into a [`ConsolidatedDataset`].
pub struct ResultAggregator;

impl ResultAggregator {
    /// Aggregate every terminal result of a finalized run.
    ///
    /// Keys are unique by construction (the planner emits at most one task
    /// per key); a duplicate here is a defect and aborts, never a silent
    /// overwrite. The method also checks that terminal results and pending
    /// tasks partition the plan with no overlap and no omission.
    pub fn aggregate(run: &CollectionRun) -> Result<ConsolidatedDataset, InvariantViolation> {
        if !run.is_finished() {
            return Err(InvariantViolation::new(
                "aggregate",
                "run has not been finalized",
            ));
        }

        let mut seen: HashSet<TaskKey> = HashSet::with_capacity(run.results().len());
        let mut records = Vec::with_capacity(run.succeeded());
        let mut manifest = Vec::with_capacity(run.failed());

        for result in run.results() {
            let key = result.task.key();
            if !seen.insert(key.clone()) {
                return Err(InvariantViolation::new(
                    "aggregate",
                    format!("duplicate dataset key {key}"),
                ));
            }
            match &result.outcome {
                Ok(payload) => records.push(DatasetRecord {
                    seq: result.task.seq,
                    key,
                    region_name: result.task.region_name.clone(),
                    municipality_name: result.task.municipality_name.clone(),
                    payload: payload.clone(),
                }),
                Err(reason) => manifest.push(ManifestEntry {
                    seq: result.task.seq,
                    key,
                    reason: *reason,
                }),
            }
        }

        if records.len() + manifest.len() + run.pending() != run.planned() {
            return Err(InvariantViolation::new(
                "aggregate",
                format!(
                    "{} records + {} failures + {} pending != {} planned",
                    records.len(),
                    manifest.len(),
                    run.pending(),
                    run.planned()
                ),
            ));
        }

        records.sort_by_key(|r| r.seq);
        manifest.sort_by_key(|m| m.seq);

        debug!(
            records = records.len(),
            failures = manifest.len(),
            "run aggregated"
        );
        Ok(ConsolidatedDataset {
            records,
            manifest,
            generated_at: Utc::now(),
        })
    }
}
