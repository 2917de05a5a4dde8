//! Bounded retry around the single-attempt fetcher.
//!
//! The remote service publishes no backoff contract, so the policy is
//! conservative and fixed-interval rather than exponential: up to three
//! attempts for retriable failures with a constant pause between them.
//! Each task's retry cycle runs as an explicit state machine, which lets
//! the bounded-parallel strategy drive many of them concurrently without
//! nested blocking loops.

use crate::collector::cancel::CancelToken;
use crate::collector::pacing::Pacer;
use crate::collector::task::FetchTask;
use crate::fetcher::{FailureReason, FetchOutcome, PaymentFetcher};
use crate::RecordPayload;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per task, first try included
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub retry_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_pause: Duration::from_secs(1),
        }
    }
}

/// Per-task retry state machine.
enum Attempt {
    /// About to issue attempt `n` (1-based)
    Pending(u32),
    /// Terminal success
    Done(RecordPayload),
    /// Terminal failure
    PermanentFailure(FailureReason),
}

/// Wraps a [`PaymentFetcher`] with bounded retry and request pacing.
pub struct RetryingFetcher {
    fetcher: Arc<dyn PaymentFetcher>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    /// Create a retrying fetcher over the given single-attempt fetcher.
    pub fn new(fetcher: Arc<dyn PaymentFetcher>, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Fetch one task to a terminal outcome.
    ///
    /// Non-retriable failures (4xx, malformed response) short-circuit after
    /// the first attempt. Exhausting all attempts on a retriable failure
    /// yields [`FailureReason::RetriesExhausted`], distinct from the
    /// original cause. Cancellation during a retry pause ends the cycle
    /// early with the last observed reason.
    pub async fn fetch(
        &self,
        task: &FetchTask,
        pacer: &Pacer,
        cancel: &CancelToken,
    ) -> FetchOutcome {
        let mut state = Attempt::Pending(1);

        loop {
            match state {
                Attempt::Pending(attempt) => {
                    pacer.pace().await;
                    debug!(task = %task.key(), attempt, "issuing fetch attempt");

                    let outcome = self
                        .fetcher
                        .fetch_payment(&task.region_ibge, &task.municipality_code, task.period)
                        .await;

                    state = match outcome {
                        Ok(payload) => Attempt::Done(payload),
                        Err(reason) if !reason.is_retriable() => {
                            warn!(task = %task.key(), %reason, "permanent failure");
                            Attempt::PermanentFailure(reason)
                        }
                        Err(reason) if attempt >= self.policy.max_attempts => {
                            warn!(
                                task = %task.key(),
                                %reason,
                                attempts = attempt,
                                "retries exhausted"
                            );
                            Attempt::PermanentFailure(FailureReason::RetriesExhausted)
                        }
                        Err(reason) => {
                            warn!(
                                task = %task.key(),
                                %reason,
                                attempt,
                                max_attempts = self.policy.max_attempts,
                                "transient failure, will retry"
                            );
                            if self.pause_or_cancelled(cancel).await {
                                // Cancelled mid-cycle; report what we saw
                                // instead of pretending we retried.
                                Attempt::PermanentFailure(reason)
                            } else {
                                Attempt::Pending(attempt + 1)
                            }
                        }
                    };
                }
                Attempt::Done(payload) => return Ok(payload),
                Attempt::PermanentFailure(reason) => return Err(reason),
            }
        }
    }

    /// Sleep the fixed retry pause; returns true if cancellation cut it
    /// short.
    async fn pause_or_cancelled(&self, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.policy.retry_pause) => false,
            _ = cancel.cancelled() => true,
        }
    }
}
