//! Integration tests for task planning over a hydrated catalog.

use crate::common::mock::small_catalog;
use acs_collector::catalog::RegionSelector;
use acs_collector::collector::TaskPlanner;
use acs_collector::Period;
use std::collections::HashSet;
use std::str::FromStr;

fn periods(tokens: &[&str]) -> Vec<Period> {
    tokens.iter().map(|t| Period::from_str(t).unwrap()).collect()
}

#[test]
fn plan_emits_one_task_per_municipality_and_period() {
    // PE has two municipalities, BA has one: one period gives three tasks.
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &periods(&["2025-06"]))
        .unwrap();
    assert_eq!(tasks.len(), 3);
}

#[test]
fn plan_keys_are_pairwise_distinct_across_regions_and_periods() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &periods(&["2025-04", "2025-05", "2025-06"]))
        .unwrap();
    assert_eq!(tasks.len(), 9);
    let keys: HashSet<_> = tasks.iter().map(|t| t.key()).collect();
    assert_eq!(keys.len(), tasks.len());
}

#[test]
fn plan_sequence_numbers_follow_catalog_then_period_order() {
    let catalog = small_catalog();
    // BA precedes PE in the selector; the catalog still orders PE first.
    let selector = RegionSelector::parse("BA,PE").unwrap();
    let tasks = TaskPlanner::new(&catalog)
        .plan(&selector, &periods(&["2025-05", "2025-06"]))
        .unwrap();

    assert_eq!(tasks[0].region_code, "PE");
    assert_eq!(tasks[0].municipality_name, "Abreu e Lima");
    assert_eq!(tasks[0].period.to_string(), "2025-05");
    assert_eq!(tasks[1].period.to_string(), "2025-06");
    assert_eq!(tasks[4].region_code, "BA");
    for (i, task) in tasks.iter().enumerate() {
        assert_eq!(task.seq, i as u64);
    }
}

#[test]
fn repeated_plans_are_identical() {
    let catalog = small_catalog();
    let selector = RegionSelector::parse("PE,BA").unwrap();
    let planner = TaskPlanner::new(&catalog);
    let first = planner.plan(&selector, &periods(&["2025-06"])).unwrap();
    let second = planner.plan(&selector, &periods(&["2025-06"])).unwrap();
    assert_eq!(first, second);
}
