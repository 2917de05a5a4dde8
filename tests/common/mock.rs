//! Programmable in-memory fetcher for orchestration tests.

use acs_collector::catalog::{Municipality, RegionCatalog};
use acs_collector::collector::{CancelToken, CollectorConfig, RetryPolicy, Strategy};
use acs_collector::fetcher::{FailureReason, FetchOutcome, PaymentFetcher};
use acs_collector::{AcsPayment, Period, RecordPayload};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted behavior for one municipality.
#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// Always return a detailed payload
    Succeed,
    /// Always fail with the given reason
    FailAlways(FailureReason),
    /// Fail the first `n` calls with the given reason, then succeed
    FailTimes(FailureReason, u32),
}

/// In-memory [`PaymentFetcher`] with per-municipality scripting and call
/// counting.
pub struct MockFetcher {
    behaviors: HashMap<String, MockBehavior>,
    calls: Mutex<HashMap<String, u32>>,
    total_calls: AtomicU32,
    cancel_after: Option<(u32, CancelToken)>,
}

impl MockFetcher {
    /// A fetcher where every municipality succeeds.
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            total_calls: AtomicU32::new(0),
            cancel_after: None,
        }
    }

    /// Script the behavior for one municipality code.
    pub fn with_behavior(mut self, municipality: &str, behavior: MockBehavior) -> Self {
        self.behaviors.insert(municipality.to_string(), behavior);
        self
    }

    /// Cancel the given token once `n` total calls were made.
    pub fn with_cancel_after(mut self, n: u32, cancel: CancelToken) -> Self {
        self.cancel_after = Some((n, cancel));
        self
    }

    /// Number of fetch calls made for one municipality.
    pub fn calls_for(&self, municipality: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(municipality)
            .copied()
            .unwrap_or(0)
    }

    /// Total fetch calls across all municipalities.
    pub fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn sample_payload() -> RecordPayload {
        RecordPayload::Detailed(AcsPayment {
            ceiling: 10,
            direct_credentialed: 8,
            indirect_credentialed: 1,
            direct_paid: 8,
            indirect_paid: 1,
            direct_amount: Decimal::new(24_000_00, 2),
            indirect_amount: Decimal::new(3_000_00, 2),
        })
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentFetcher for MockFetcher {
    async fn fetch_payment(&self, _: &str, municipality_ibge: &str, _: Period) -> FetchOutcome {
        let total = self.total_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((threshold, cancel)) = &self.cancel_after {
            if total >= *threshold {
                cancel.cancel();
            }
        }

        let call = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry(municipality_ibge.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        match self.behaviors.get(municipality_ibge) {
            None | Some(MockBehavior::Succeed) => Ok(Self::sample_payload()),
            Some(MockBehavior::FailAlways(reason)) => Err(*reason),
            Some(MockBehavior::FailTimes(reason, n)) => {
                if call <= *n {
                    Err(*reason)
                } else {
                    Ok(Self::sample_payload())
                }
            }
        }
    }
}

/// Catalog with two hydrated regions: PE (two municipalities) and BA (one).
pub fn small_catalog() -> RegionCatalog {
    let mut catalog = RegionCatalog::builtin();
    catalog
        .set_municipalities(
            "PE",
            vec![
                Municipality {
                    ibge_code: "2600054".to_string(),
                    name: "Abreu e Lima".to_string(),
                },
                Municipality {
                    ibge_code: "2611606".to_string(),
                    name: "Recife".to_string(),
                },
            ],
        )
        .unwrap();
    catalog
        .set_municipalities(
            "BA",
            vec![Municipality {
                ibge_code: "2927408".to_string(),
                name: "Salvador".to_string(),
            }],
        )
        .unwrap();
    catalog
}

/// Collector config with no pacing or retry pauses, for fast tests.
pub fn fast_config(strategy: Strategy) -> CollectorConfig {
    CollectorConfig {
        strategy,
        min_request_spacing: Duration::ZERO,
        retry: RetryPolicy {
            max_attempts: 3,
            retry_pause: Duration::from_millis(1),
        },
    }
}
