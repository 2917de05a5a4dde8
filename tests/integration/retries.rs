//! Integration tests for retry behavior through the full orchestration path.

use crate::common::mock::{fast_config, small_catalog, MockBehavior, MockFetcher};
use acs_collector::aggregate::ResultAggregator;
use acs_collector::catalog::RegionSelector;
use acs_collector::collector::{CancelToken, CollectionOrchestrator, Strategy, TaskPlanner};
use acs_collector::fetcher::FailureReason;
use acs_collector::Period;
use std::str::FromStr;
use std::sync::Arc;

fn one_period() -> Vec<Period> {
    vec![Period::from_str("2025-06").unwrap()]
}

#[tokio::test]
async fn persistent_server_error_exhausts_retries_and_lands_in_manifest() {
    // PE's two municipalities succeed; Salvador answers 500 on every try.
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    let fetcher = Arc::new(MockFetcher::new().with_behavior(
        "2927408",
        MockBehavior::FailAlways(FailureReason::Remote5xx { status: 500 }),
    ));
    let orchestrator = CollectionOrchestrator::new(
        fetcher.clone(),
        fast_config(Strategy::Sequential),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();

    let summary = run.summary();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(fetcher.calls_for("2927408"), 3);
    // Two clean tasks plus three attempts on the failing one.
    assert_eq!(fetcher.total_calls(), 5);

    let dataset = ResultAggregator::aggregate(&run).unwrap();
    assert_eq!(dataset.manifest.len(), 1);
    let entry = &dataset.manifest[0];
    assert_eq!(entry.key.region, "BA");
    assert_eq!(entry.key.municipality, "2927408");
    // Reported distinctly from the underlying 500.
    assert_eq!(entry.reason, FailureReason::RetriesExhausted);
}

#[tokio::test]
async fn client_error_never_triggers_a_second_attempt() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    let fetcher = Arc::new(MockFetcher::new().with_behavior(
        "2927408",
        MockBehavior::FailAlways(FailureReason::Remote4xx { status: 404 }),
    ));
    let orchestrator = CollectionOrchestrator::new(
        fetcher.clone(),
        fast_config(Strategy::Sequential),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();

    assert_eq!(fetcher.calls_for("2927408"), 1);
    let dataset = ResultAggregator::aggregate(&run).unwrap();
    assert_eq!(
        dataset.manifest[0].reason,
        FailureReason::Remote4xx { status: 404 }
    );
}

#[tokio::test]
async fn transient_failures_recover_within_the_attempt_budget() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    // Two timeouts, then success: stays within three attempts.
    let fetcher = Arc::new(MockFetcher::new().with_behavior(
        "2927408",
        MockBehavior::FailTimes(FailureReason::TransientTimeout, 2),
    ));
    let orchestrator = CollectionOrchestrator::new(
        fetcher.clone(),
        fast_config(Strategy::Sequential),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();

    assert_eq!(run.succeeded(), 1);
    assert_eq!(run.failed(), 0);
    assert_eq!(fetcher.calls_for("2927408"), 3);
}

#[tokio::test]
async fn all_tasks_failing_reports_no_data_collected() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &one_period())
        .unwrap();

    let fetcher = MockFetcher::new()
        .with_behavior(
            "2600054",
            MockBehavior::FailAlways(FailureReason::MalformedResponse),
        )
        .with_behavior(
            "2611606",
            MockBehavior::FailAlways(FailureReason::Remote4xx { status: 403 }),
        );
    let orchestrator = CollectionOrchestrator::new(
        Arc::new(fetcher),
        fast_config(Strategy::Sequential),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();

    let summary = run.summary();
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(
        summary.outcome(),
        acs_collector::collector::RunOutcome::NoData
    );
}
