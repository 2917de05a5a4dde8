//! Run-level state: the task list, per-task states, and final summary.

use crate::collector::progress::ProgressSnapshot;
use crate::collector::task::{FetchResult, FetchTask};
use crate::collector::InvariantViolation;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Life cycle of one task inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    /// Not yet dispatched
    Pending,
    /// Dispatched, no terminal outcome yet
    InFlight,
    /// Terminal: produced a payload
    Succeeded,
    /// Terminal: ended with a classified failure
    Failed,
}

/// Final disposition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Tasks are still executing
    InProgress,
    /// Every planned task reached a terminal state
    Completed,
    /// A stop signal left tasks pending; reported distinctly, never merged
    /// into `Completed`
    Cancelled,
}

/// Caller-facing reading of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task succeeded
    Clean,
    /// The run completed with this many failures
    PartialFailures(usize),
    /// Nonzero plan, zero successes
    NoData,
    /// The run was cancelled partway
    Cancelled,
}

/// Final numbers for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Total planned tasks
    pub planned: usize,
    /// Tasks that produced a payload
    pub succeeded: usize,
    /// Tasks that ended in failure
    pub failed: usize,
    /// Tasks never dispatched (nonzero only for cancelled runs)
    pub pending: usize,
    /// Wall-clock duration of the execution phase
    pub duration: Duration,
    /// Final status
    pub status: RunStatus,
}

impl RunSummary {
    /// Collapse the numbers into the caller-facing outcome.
    pub fn outcome(&self) -> RunOutcome {
        if self.status == RunStatus::Cancelled {
            RunOutcome::Cancelled
        } else if self.planned > 0 && self.succeeded == 0 {
            RunOutcome::NoData
        } else if self.failed > 0 {
            RunOutcome::PartialFailures(self.failed)
        } else {
            RunOutcome::Clean
        }
    }
}

/// Top-level aggregate for one collection invocation.
///
/// Created when execution starts and mutated only by the orchestrator; once
/// [`finish`](CollectionRun::finish) runs, nothing mutates it further and
/// the aggregator consumes it read-only.
#[derive(Debug)]
pub struct CollectionRun {
    tasks: Vec<FetchTask>,
    states: Vec<TaskState>,
    results: Vec<FetchResult>,
    succeeded: usize,
    failed: usize,
    status: RunStatus,
    started: Instant,
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl CollectionRun {
    /// Start a run over a planned task list.
    ///
    /// Sequence numbers must be dense and in order; anything else is a
    /// planner defect and aborts before any task executes.
    pub fn new(tasks: Vec<FetchTask>) -> Result<Self, InvariantViolation> {
        for (position, task) in tasks.iter().enumerate() {
            if task.seq != position as u64 {
                return Err(InvariantViolation::new(
                    "plan",
                    format!(
                        "task {} has sequence {} at position {position}",
                        task.key(),
                        task.seq
                    ),
                ));
            }
        }
        let states = vec![TaskState::Pending; tasks.len()];
        Ok(Self {
            tasks,
            states,
            results: Vec::new(),
            succeeded: 0,
            failed: 0,
            status: RunStatus::InProgress,
            started: Instant::now(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        })
    }

    /// Total planned tasks.
    pub fn planned(&self) -> usize {
        self.tasks.len()
    }

    /// Tasks that reached a terminal state.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Tasks that produced a payload.
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Tasks that ended in failure.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Tasks never dispatched or still in flight.
    pub fn pending(&self) -> usize {
        self.planned() - self.completed()
    }

    /// The planned tasks, in sequence order.
    pub fn tasks(&self) -> &[FetchTask] {
        &self.tasks
    }

    /// One task by sequence number.
    pub fn task(&self, seq: u64) -> &FetchTask {
        &self.tasks[seq as usize]
    }

    /// Terminal results in completion order.
    pub fn results(&self) -> &[FetchResult] {
        &self.results
    }

    /// State of one task.
    pub fn state(&self, seq: u64) -> TaskState {
        self.states[seq as usize]
    }

    /// Current run status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Wall-clock instant the run started, for output stamping.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the run has been finalized.
    pub fn is_finished(&self) -> bool {
        self.status != RunStatus::InProgress
    }

    /// Current progress snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            planned: self.planned(),
            completed: self.completed(),
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }

    /// Mark a task as dispatched.
    pub fn mark_in_flight(&mut self, seq: u64) -> Result<(), InvariantViolation> {
        let index = seq as usize;
        if index >= self.states.len() {
            return Err(InvariantViolation::new(
                "dispatch",
                format!("sequence {seq} outside plan of {}", self.planned()),
            ));
        }
        if self.states[index] != TaskState::Pending {
            return Err(InvariantViolation::new(
                "dispatch",
                format!(
                    "task {} dispatched twice (state {:?})",
                    self.tasks[index].key(),
                    self.states[index]
                ),
            ));
        }
        self.states[index] = TaskState::InFlight;
        Ok(())
    }

    /// Record a terminal outcome and return the updated snapshot.
    ///
    /// Every task reaches a terminal state exactly once; a second terminal
    /// outcome for the same sequence number is a defect.
    pub fn record(&mut self, result: FetchResult) -> Result<ProgressSnapshot, InvariantViolation> {
        let index = result.task.seq as usize;
        if index >= self.states.len() {
            return Err(InvariantViolation::new(
                "record",
                format!(
                    "result for task {} outside plan of {}",
                    result.task.key(),
                    self.planned()
                ),
            ));
        }
        match self.states[index] {
            TaskState::Pending | TaskState::InFlight => {}
            terminal => {
                return Err(InvariantViolation::new(
                    "record",
                    format!(
                        "task {} already terminal ({terminal:?})",
                        result.task.key()
                    ),
                ));
            }
        }

        if result.is_success() {
            self.states[index] = TaskState::Succeeded;
            self.succeeded += 1;
        } else {
            self.states[index] = TaskState::Failed;
            self.failed += 1;
        }
        self.results.push(result);
        Ok(self.snapshot())
    }

    /// Finalize the run. No mutation happens after this.
    pub fn finish(mut self, status: RunStatus) -> Self {
        self.status = status;
        self.duration = self.started.elapsed();
        self
    }

    /// Final numbers for reporting.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            planned: self.planned(),
            succeeded: self.succeeded,
            failed: self.failed,
            pending: self.pending(),
            duration: self.duration,
            status: self.status,
        }
    }
}
