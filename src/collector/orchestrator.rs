//! Execution of a planned task list.
//!
//! Two strategies: strictly-ordered sequential execution (the default; it
//! keeps load on the remote service minimal and predictable) and a bounded
//! worker pool. In both, the orchestrator is the only writer of run state:
//! workers report events over a channel and never touch the counters
//! themselves. Request pacing applies per in-flight slot, so the effective
//! request rate scales with the pool size the caller chose.

use crate::collector::cancel::CancelToken;
use crate::collector::pacing::Pacer;
use crate::collector::progress::{ProgressLog, ProgressSnapshot};
use crate::collector::retry::{RetryPolicy, RetryingFetcher};
use crate::collector::run::{CollectionRun, RunStatus};
use crate::collector::task::{FetchResult, FetchTask};
use crate::collector::CollectError;
use crate::fetcher::PaymentFetcher;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, info_span, warn, Instrument};

/// Upper bound on the worker pool, to prevent self-inflicted rate limiting.
pub const MAX_WORKERS: usize = 32;

/// Caller-selected execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One task in flight at a time, in planned order
    Sequential,
    /// Up to `workers` tasks in flight concurrently
    BoundedParallel {
        /// Pool size (1..=MAX_WORKERS)
        workers: usize,
    },
}

impl Strategy {
    /// Validate the pool bound.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Strategy::Sequential => Ok(()),
            Strategy::BoundedParallel { workers } => {
                if *workers == 0 {
                    Err("worker pool size must be at least 1".to_string())
                } else if *workers > MAX_WORKERS {
                    Err(format!("worker pool size {workers} exceeds maximum of {MAX_WORKERS}"))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Tunable knobs for one collection run.
#[derive(Debug, Clone, Copy)]
pub struct CollectorConfig {
    /// Execution strategy
    pub strategy: Strategy,
    /// Minimum spacing between requests per in-flight slot
    pub min_request_spacing: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Sequential,
            min_request_spacing: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

/// Events workers report back to the orchestrator.
enum TaskEvent {
    /// The task with this sequence number was dispatched
    Started(u64),
    /// The task reached a terminal outcome
    Finished(FetchResult),
}

/// Drives a task list to completion under the configured strategy.
///
/// Failure isolation: a failed task never aborts the run. The orchestrator
/// drains the full task list and only the final report distinguishes a
/// clean run from one with failures. The run aborts only on invariant
/// violations, which indicate a defect.
pub struct CollectionOrchestrator {
    fetcher: Arc<dyn PaymentFetcher>,
    config: CollectorConfig,
    cancel: CancelToken,
    progress: watch::Sender<ProgressSnapshot>,
}

impl CollectionOrchestrator {
    /// Create an orchestrator over a fetcher.
    pub fn new(
        fetcher: Arc<dyn PaymentFetcher>,
        config: CollectorConfig,
        cancel: CancelToken,
    ) -> Self {
        let (progress, _) = watch::channel(ProgressSnapshot::default());
        Self {
            fetcher,
            config,
            cancel,
            progress,
        }
    }

    /// Subscribe to progress snapshots, e.g. to render an indicator.
    /// Snapshots advance monotonically regardless of strategy.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    /// Execute the task list to a finalized run.
    ///
    /// Consumes the orchestrator: one run per invocation, after which the
    /// progress channel closes.
    pub async fn run(self, tasks: Vec<FetchTask>) -> Result<CollectionRun, CollectError> {
        self.config
            .strategy
            .validate()
            .map_err(CollectError::Worker)?;

        let span = info_span!("collection_run", planned = tasks.len(), strategy = ?self.config.strategy);
        async {
            let mut run = CollectionRun::new(tasks)?;
            self.progress.send_replace(run.snapshot());
            info!(planned = run.planned(), "collection run starting");

            match self.config.strategy {
                Strategy::Sequential => self.run_sequential(&mut run).await?,
                Strategy::BoundedParallel { workers } => {
                    self.run_parallel(&mut run, workers).await?
                }
            }

            // Tasks left pending mean the stop signal cut the run short.
            let status = if run.pending() > 0 {
                warn!(pending = run.pending(), "run cancelled before completion");
                RunStatus::Cancelled
            } else {
                RunStatus::Completed
            };
            let run = run.finish(status);
            info!(
                succeeded = run.succeeded(),
                failed = run.failed(),
                pending = run.pending(),
                status = ?run.status(),
                "collection run finished"
            );
            Ok(run)
        }
        .instrument(span)
        .await
    }

    /// Strictly-ordered execution, one task in flight at a time.
    async fn run_sequential(&self, run: &mut CollectionRun) -> Result<(), CollectError> {
        let retrier = RetryingFetcher::new(Arc::clone(&self.fetcher), self.config.retry);
        let pacer = Pacer::new(self.config.min_request_spacing);
        let mut log = ProgressLog::default();

        for seq in 0..run.planned() as u64 {
            if self.cancel.is_cancelled() {
                debug!(seq, "stop signal observed, halting submission");
                break;
            }
            run.mark_in_flight(seq)?;
            let task = run.task(seq).clone();
            let outcome = retrier.fetch(&task, &pacer, &self.cancel).await;
            let snapshot = run.record(FetchResult { task, outcome })?;
            self.progress.send_replace(snapshot);
            log.observe(&snapshot);
        }
        Ok(())
    }

    /// Bounded worker pool over a shared queue.
    ///
    /// Completion order is not guaranteed; results are attributed back by
    /// sequence number and dataset ordering is restored at aggregation.
    async fn run_parallel(
        &self,
        run: &mut CollectionRun,
        workers: usize,
    ) -> Result<(), CollectError> {
        let queue: Arc<Mutex<VecDeque<FetchTask>>> =
            Arc::new(Mutex::new(run.tasks().iter().cloned().collect()));
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<TaskEvent>();

        let mut handles = Vec::with_capacity(workers);
        for slot in 0..workers {
            let queue = Arc::clone(&queue);
            let events = events_tx.clone();
            let retrier = RetryingFetcher::new(Arc::clone(&self.fetcher), self.config.retry);
            // One pacer per slot: spacing is honored within each in-flight
            // lane, and the overall rate scales with the pool size.
            let pacer = Pacer::new(self.config.min_request_spacing);
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let task = queue.lock().await.pop_front();
                    let Some(task) = task else { break };
                    if events.send(TaskEvent::Started(task.seq)).is_err() {
                        break;
                    }
                    // A claimed task always reaches a terminal outcome,
                    // even when cancellation arrives mid-fetch.
                    let outcome = retrier.fetch(&task, &pacer, &cancel).await;
                    if events
                        .send(TaskEvent::Finished(FetchResult { task, outcome }))
                        .is_err()
                    {
                        break;
                    }
                }
                debug!(slot, "worker drained");
            }));
        }
        drop(events_tx);

        let mut log = ProgressLog::default();
        while let Some(event) = events_rx.recv().await {
            match event {
                TaskEvent::Started(seq) => run.mark_in_flight(seq)?,
                TaskEvent::Finished(result) => {
                    let snapshot = run.record(result)?;
                    self.progress.send_replace(snapshot);
                    log.observe(&snapshot);
                }
            }
        }

        for handle in handles {
            handle
                .await
                .map_err(|e| CollectError::Worker(e.to_string()))?;
        }
        Ok(())
    }
}
