//! Integration tests for output files produced from a full run.

use crate::common::mock::{fast_config, small_catalog, MockBehavior, MockFetcher};
use acs_collector::aggregate::ResultAggregator;
use acs_collector::catalog::RegionSelector;
use acs_collector::collector::{CancelToken, CollectionOrchestrator, Strategy, TaskPlanner};
use acs_collector::fetcher::FailureReason;
use acs_collector::output::csv::{write_dataset, write_manifest};
use acs_collector::output::path::{consolidated_path, manifest_path, region_path, run_stamp};
use acs_collector::Period;
use std::str::FromStr;
use std::sync::Arc;

#[tokio::test]
async fn run_artifacts_cover_dataset_manifest_and_partitions() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &[Period::from_str("2025-06").unwrap()])
        .unwrap();

    let fetcher = MockFetcher::new().with_behavior(
        "2927408",
        MockBehavior::FailAlways(FailureReason::Remote5xx { status: 502 }),
    );
    let orchestrator = CollectionOrchestrator::new(
        Arc::new(fetcher),
        fast_config(Strategy::Sequential),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();
    let dataset = ResultAggregator::aggregate(&run).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let stamp = run_stamp(run.started_at());

    let consolidated = consolidated_path(dir.path(), &stamp);
    let written = write_dataset(&consolidated, dataset.records.iter()).unwrap();
    assert_eq!(written, 2);

    let manifest = manifest_path(dir.path(), &stamp);
    let failures = write_manifest(&manifest, &dataset.manifest).unwrap();
    assert_eq!(failures, 1);

    for (region, records) in dataset.partition_by_region() {
        let path = region_path(dir.path(), &region, &stamp);
        let rows = write_dataset(&path, records).unwrap();
        assert!(rows > 0);
        assert!(path.exists());
    }

    // Only PE produced records; BA's sole municipality failed.
    assert!(region_path(dir.path(), "PE", &stamp).exists());
    assert!(!region_path(dir.path(), "BA", &stamp).exists());

    let consolidated_content = std::fs::read_to_string(&consolidated).unwrap();
    assert!(consolidated_content.contains("Recife"));
    assert!(consolidated_content.contains("2025-06"));
    assert!(consolidated_content.contains("detailed"));

    let manifest_content = std::fs::read_to_string(&manifest).unwrap();
    assert!(manifest_content.contains("retries-exhausted"));
    assert!(manifest_content.contains("2927408"));
}

#[tokio::test]
async fn consolidated_file_orders_rows_by_region_municipality_period() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(
            &selector,
            &[
                Period::from_str("2025-05").unwrap(),
                Period::from_str("2025-06").unwrap(),
            ],
        )
        .unwrap();

    let orchestrator = CollectionOrchestrator::new(
        Arc::new(MockFetcher::new()),
        fast_config(Strategy::BoundedParallel { workers: 3 }),
        CancelToken::new(),
    );
    let run = orchestrator.run(tasks).await.unwrap();
    let dataset = ResultAggregator::aggregate(&run).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let path = consolidated_path(dir.path(), &run_stamp(run.started_at()));
    write_dataset(&path, dataset.records.iter()).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let data_lines: Vec<&str> = content.lines().skip(1).collect();
    assert_eq!(data_lines.len(), 6);

    // Municipalities appear in directory order, each with its periods in
    // the order the caller requested, regions in catalog order.
    assert!(data_lines[0].starts_with("PE,") && data_lines[0].contains("Abreu e Lima"));
    assert!(data_lines[0].contains("2025-05"));
    assert!(data_lines[1].contains("2025-06"));
    assert!(data_lines[2].contains("Recife"));
    assert!(data_lines[4].starts_with("BA,"));
}
