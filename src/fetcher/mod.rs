//! Remote data fetching and failure classification.
//!
//! The client here is the single place that decides whether a failure is
//! retriable. Every other component trusts the [`FailureReason`] it assigns.

use crate::{Period, RecordPayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod aps_config;
pub mod aps_http;
pub mod aps_parser;

/// Classified outcome of a failed fetch attempt.
///
/// Attached to the task's sequence number in the failure manifest; never
/// silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, Serialize, Deserialize)]
pub enum FailureReason {
    /// Connection-level failure before a response arrived
    #[error("network failure before a response arrived")]
    TransientNetwork,

    /// The request deadline elapsed
    #[error("request deadline exceeded")]
    TransientTimeout,

    /// The server rejected the request; it will never accept it as-is
    #[error("request rejected by the server (HTTP {status})")]
    Remote4xx {
        /// HTTP status code
        status: u16,
    },

    /// Server-side failure, worth retrying
    #[error("server-side failure (HTTP {status})")]
    Remote5xx {
        /// HTTP status code
        status: u16,
    },

    /// The response did not match the expected payload shape
    #[error("response did not match the expected payload shape")]
    MalformedResponse,

    /// All retry attempts on a retriable failure were used up
    #[error("gave up after repeated transient failures")]
    RetriesExhausted,
}

impl FailureReason {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            FailureReason::TransientNetwork
                | FailureReason::TransientTimeout
                | FailureReason::Remote5xx { .. }
        )
    }

    /// Stable token used in manifests and record-oriented outputs.
    pub fn as_token(&self) -> &'static str {
        match self {
            FailureReason::TransientNetwork => "transient-network",
            FailureReason::TransientTimeout => "transient-timeout",
            FailureReason::Remote4xx { .. } => "remote-4xx",
            FailureReason::Remote5xx { .. } => "remote-5xx",
            FailureReason::MalformedResponse => "malformed-response",
            FailureReason::RetriesExhausted => "retries-exhausted",
        }
    }
}

/// Outcome of a single fetch attempt.
pub type FetchOutcome = Result<RecordPayload, FailureReason>;

/// Single-attempt payment fetcher.
///
/// Implementations perform exactly one request per call; retry policy lives
/// in [`RetryingFetcher`](crate::collector::RetryingFetcher).
#[async_trait]
pub trait PaymentFetcher: Send + Sync {
    /// Fetch the payment record for one (region, municipality, period).
    ///
    /// # Arguments
    /// * `region_ibge` - IBGE code of the federal unit (e.g. "26")
    /// * `municipality_ibge` - IBGE code of the municipality
    /// * `period` - Calendar month to query
    async fn fetch_payment(
        &self,
        region_ibge: &str,
        municipality_ibge: &str,
        period: Period,
    ) -> FetchOutcome;
}
