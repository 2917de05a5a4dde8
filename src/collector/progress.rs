//! Progress snapshots and their rate-limited log emission.

use serde::Serialize;
use tracing::info;

/// Point-in-time view of a run, taken after a task reaches a terminal
/// state.
///
/// `completed` never decreases across snapshots of one run and always
/// equals `succeeded + failed`; it reaches `planned` exactly once, at run
/// end (or stays short of it when the run is cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProgressSnapshot {
    /// Total tasks in the plan
    pub planned: usize,
    /// Tasks that reached a terminal state
    pub completed: usize,
    /// Tasks that produced a payload
    pub succeeded: usize,
    /// Tasks that ended with a classified failure
    pub failed: usize,
}

impl ProgressSnapshot {
    /// Completion percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.planned == 0 {
            100.0
        } else {
            (self.completed as f64 / self.planned as f64) * 100.0
        }
    }

    /// Whether every planned task reached a terminal state.
    pub fn is_final(&self) -> bool {
        self.completed == self.planned
    }

    /// Human-readable progress line.
    pub fn format_progress(&self) -> String {
        format!(
            "{}/{} tasks complete ({:.1}%) | {} succeeded | {} failed",
            self.completed,
            self.planned,
            self.percentage(),
            self.succeeded,
            self.failed
        )
    }
}

/// Emits progress lines when completion advances by a percentage step,
/// so long runs stay visible without flooding the log.
#[derive(Debug)]
pub struct ProgressLog {
    min_step_pct: f64,
    last_reported_pct: f64,
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self {
            min_step_pct: 10.0,
            last_reported_pct: 0.0,
        }
    }
}

impl ProgressLog {
    /// Create a log with a custom percentage step.
    pub fn with_step(min_step_pct: f64) -> Self {
        Self {
            min_step_pct,
            last_reported_pct: 0.0,
        }
    }

    /// Observe a snapshot, emitting a progress line when warranted.
    pub fn observe(&mut self, snapshot: &ProgressSnapshot) {
        let pct = snapshot.percentage();
        if snapshot.is_final() || pct - self.last_reported_pct >= self.min_step_pct {
            info!("{}", snapshot.format_progress());
            self.last_reported_pct = pct;
        }
    }
}
