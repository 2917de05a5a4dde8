//! Integration tests for sequential and bounded-parallel execution.

use crate::common::mock::{fast_config, small_catalog, MockBehavior, MockFetcher};
use acs_collector::aggregate::ResultAggregator;
use acs_collector::catalog::{Municipality, RegionCatalog, RegionSelector};
use acs_collector::collector::{
    CancelToken, CollectionOrchestrator, RunStatus, Strategy, TaskPlanner,
};
use acs_collector::fetcher::FailureReason;
use acs_collector::Period;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

fn one_period() -> Vec<Period> {
    vec![Period::from_str("2025-06").unwrap()]
}

/// A wider catalog for parallel runs: one region, eight municipalities.
fn wide_catalog() -> RegionCatalog {
    let mut catalog = RegionCatalog::builtin();
    let municipalities = (0..8)
        .map(|i| Municipality {
            ibge_code: format!("26000{i:02}"),
            name: format!("Municipality {i}"),
        })
        .collect();
    catalog.set_municipalities("PE", municipalities).unwrap();
    catalog
}

#[tokio::test]
async fn sequential_run_collects_all_tasks() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    let orchestrator = CollectionOrchestrator::new(
        Arc::new(MockFetcher::new()),
        fast_config(Strategy::Sequential),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();

    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(run.succeeded(), 3);
    assert_eq!(run.failed(), 0);

    let dataset = ResultAggregator::aggregate(&run).unwrap();
    assert_eq!(dataset.records.len(), 3);
    assert!(dataset.manifest.is_empty());
}

#[tokio::test]
async fn sequential_results_preserve_plan_order() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    let orchestrator = CollectionOrchestrator::new(
        Arc::new(MockFetcher::new()),
        fast_config(Strategy::Sequential),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();

    let seqs: Vec<u64> = run.results().iter().map(|r| r.task.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
}

#[tokio::test]
async fn parallel_run_loses_no_task() {
    let catalog = wide_catalog();
    let selector = RegionSelector::parse("PE").unwrap();
    let periods = vec![
        Period::from_str("2025-05").unwrap(),
        Period::from_str("2025-06").unwrap(),
    ];
    let tasks = TaskPlanner::new(&catalog).plan(&selector, &periods).unwrap();
    let planned_keys: HashSet<_> = tasks.iter().map(|t| t.key()).collect();
    assert_eq!(tasks.len(), 16);

    let fetcher = MockFetcher::new()
        .with_behavior("2600000", MockBehavior::Succeed)
        .with_behavior("2600003", MockBehavior::FailAlways(FailureReason::Remote4xx { status: 404 }))
        .with_behavior(
            "2600005",
            MockBehavior::FailAlways(FailureReason::MalformedResponse),
        );
    let orchestrator = CollectionOrchestrator::new(
        Arc::new(fetcher),
        fast_config(Strategy::BoundedParallel { workers: 4 }),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();

    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(run.completed(), 16);
    assert_eq!(run.failed(), 4); // two failing municipalities x two periods

    // The terminal key set equals the planned key set exactly.
    let dataset = ResultAggregator::aggregate(&run).unwrap();
    let terminal_keys: HashSet<_> = dataset
        .records
        .iter()
        .map(|r| r.key.clone())
        .chain(dataset.manifest.iter().map(|m| m.key.clone()))
        .collect();
    assert_eq!(terminal_keys, planned_keys);
}

#[tokio::test]
async fn parallel_dataset_order_is_independent_of_completion_order() {
    let catalog = wide_catalog();
    let selector = RegionSelector::parse("PE").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    let orchestrator = CollectionOrchestrator::new(
        Arc::new(MockFetcher::new()),
        fast_config(Strategy::BoundedParallel { workers: 8 }),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();
    let dataset = ResultAggregator::aggregate(&run).unwrap();

    let seqs: Vec<u64> = dataset.records.iter().map(|r| r.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort_unstable();
    assert_eq!(seqs, sorted);
    assert_eq!(seqs.len(), 8);
}

#[tokio::test]
async fn progress_snapshots_are_monotonic_and_consistent() {
    let catalog = wide_catalog();
    let selector = RegionSelector::parse("PE").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();
    let planned = tasks.len();

    let orchestrator = CollectionOrchestrator::new(
        Arc::new(MockFetcher::new()),
        fast_config(Strategy::BoundedParallel { workers: 3 }),
        CancelToken::new(),
    );
    let mut progress = orchestrator.subscribe();

    let observer = tokio::spawn(async move {
        let mut last_completed = 0usize;
        let mut final_seen = false;
        while progress.changed().await.is_ok() {
            let snapshot = *progress.borrow();
            assert!(snapshot.completed >= last_completed, "progress went backwards");
            assert_eq!(snapshot.completed, snapshot.succeeded + snapshot.failed);
            assert!(snapshot.completed <= snapshot.planned);
            last_completed = snapshot.completed;
            if snapshot.planned == planned && snapshot.is_final() {
                final_seen = true;
            }
        }
        (last_completed, final_seen)
    });

    let run = orchestrator.run(tasks).await.unwrap();
    let (last_completed, final_seen) = observer.await.unwrap();

    assert_eq!(run.completed(), planned);
    assert_eq!(last_completed, planned);
    assert!(final_seen, "no final snapshot observed");
}

#[tokio::test]
async fn invalid_worker_count_is_rejected() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    let orchestrator = CollectionOrchestrator::new(
        Arc::new(MockFetcher::new()),
        fast_config(Strategy::BoundedParallel { workers: 0 }),
        CancelToken::new(),
    );
    assert!(orchestrator.run(tasks).await.is_err());
}
