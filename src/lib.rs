//! # ACS Collector Library
//!
//! A library for collecting community health agent (ACS) payment records from
//! the Brazilian primary-care reporting API. Designed for bulk, multi-region
//! collection runs that stay consistent in the face of a rate-limited and
//! occasionally unreliable remote service.
//!
//! ## Features
//!
//! - **Multi-Region Collection**: Any subset of the 27 federal units, or all
//!   of them, across any list of monthly periods
//! - **Failure Isolation**: A failed municipality never aborts the run; every
//!   failure is classified and recorded in a manifest
//! - **Bounded Retry**: Fixed-interval retries with request pacing to respect
//!   the remote service
//! - **Sequential or Bounded-Parallel**: Caller-selected execution strategy
//!   with monotonic progress reporting and cooperative cancellation
//! - **Type-Safe Payloads**: Detailed and budget-only payment records are
//!   distinct variants, decided at parse time
//!
//! ## Quick Start
//!
//! ```no_run
//! use acs_collector::catalog::{RegionCatalog, RegionSelector};
//! use acs_collector::collector::{CancelToken, CollectionOrchestrator, CollectorConfig, TaskPlanner};
//! use acs_collector::fetcher::aps_http::ApsHttpClient;
//! use acs_collector::Period;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = RegionCatalog::builtin();
//! let selector = RegionSelector::parse("PE,SP")?;
//! let periods = vec!["2025-06".parse::<Period>()?];
//!
//! let tasks = TaskPlanner::new(&catalog).plan(&selector, &periods)?;
//!
//! let orchestrator = CollectionOrchestrator::new(
//!     Arc::new(ApsHttpClient::new()),
//!     CollectorConfig::default(),
//!     CancelToken::new(),
//! );
//! let run = orchestrator.run(tasks).await?;
//! let dataset = acs_collector::aggregate::ResultAggregator::aggregate(&run)?;
//! println!("{} records collected", dataset.records.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`catalog`] - Static region directory and selector resolution
//! - [`fetcher`] - HTTP client, payload parsing, and failure classification
//! - [`collector`] - Task planning, retry policy, pacing, cancellation, and
//!   orchestration
//! - [`aggregate`] - Consolidation of run results into ordered datasets
//! - [`output`] - CSV writers for datasets and failure manifests

#![warn(missing_docs)]
#![warn(clippy::all)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Consolidation of run results into ordered datasets
pub mod aggregate;

/// Static region directory and selector resolution
pub mod catalog;

/// CLI command implementations
pub mod cli;

/// Task planning, retry policy, pacing, and orchestration
pub mod collector;

/// HTTP client, payload parsing, and failure classification
pub mod fetcher;

/// Dataset and manifest output writers
pub mod output;

/// A calendar year-month, the time axis for collected records.
///
/// Parsed from the `"2025-06"` token form; ordered chronologically so
/// consolidated datasets sort naturally by period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: u16,
    month: u8,
}

impl Period {
    /// Build a period from numeric parts, validating the month.
    pub fn new(year: u16, month: u8) -> Result<Self, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("month {month} out of range 1-12"));
        }
        if !(2000..=2100).contains(&year) {
            return Err(format!("year {year} out of plausible range"));
        }
        Ok(Self { year, month })
    }

    /// Calendar year.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Calendar month (1-12).
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Render in the `AAAA/MM` form the remote API expects for
    /// `nuParcelaInicio` / `nuParcelaFim`.
    pub fn to_query_token(&self) -> String {
        format!("{:04}/{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid period '{s}', expected YYYY-MM"))?;
        let year: u16 = year
            .parse()
            .map_err(|_| format!("invalid year in period '{s}'"))?;
        let month: u8 = month
            .parse()
            .map_err(|_| format!("invalid month in period '{s}'"))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

/// Detailed ACS payment record for one (region, municipality, period).
///
/// Mirrors the quantitative fields of the remote payments section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcsPayment {
    /// Authorized agent ceiling
    pub ceiling: u32,
    /// Directly credentialed agents
    pub direct_credentialed: u32,
    /// Indirectly credentialed agents
    pub indirect_credentialed: u32,
    /// Directly paid agents
    pub direct_paid: u32,
    /// Indirectly paid agents
    pub indirect_paid: u32,
    /// Total amount transferred for direct agents
    pub direct_amount: Decimal,
    /// Total amount transferred for indirect agents
    pub indirect_amount: Decimal,
}

impl AcsPayment {
    /// Total credentialed agents (direct + indirect).
    pub fn credentialed(&self) -> u32 {
        self.direct_credentialed + self.indirect_credentialed
    }

    /// Total paid agents (direct + indirect).
    pub fn paid(&self) -> u32 {
        self.direct_paid + self.indirect_paid
    }

    /// Total transferred amount (direct + indirect).
    pub fn amount_total(&self) -> Decimal {
        self.direct_amount + self.indirect_amount
    }

    /// Validate record consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.direct_paid > self.direct_credentialed {
            return Err(format!(
                "direct paid ({}) exceeds direct credentialed ({})",
                self.direct_paid, self.direct_credentialed
            ));
        }
        if self.indirect_paid > self.indirect_credentialed {
            return Err(format!(
                "indirect paid ({}) exceeds indirect credentialed ({})",
                self.indirect_paid, self.indirect_credentialed
            ));
        }
        if self.direct_amount < Decimal::ZERO || self.indirect_amount < Decimal::ZERO {
            return Err("transfer amounts must be non-negative".to_string());
        }
        Ok(())
    }
}

/// Budget-level summary for periods where the remote service publishes only
/// financial plan totals, without per-agent quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    /// Budget plan label
    pub plan: String,
    /// Effective transfer amount
    pub transfer_amount: Decimal,
}

/// Payload of one successful fetch. The remote service answers with either a
/// detailed quantitative record or only a budget-level summary; the variant
/// is decided at parse time and consumers pattern-match on it explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordPayload {
    /// Full quantitative record from the payments section
    Detailed(AcsPayment),
    /// Financial totals only, from the budget plan summaries
    BudgetOnly(BudgetSummary),
}

impl RecordPayload {
    /// Short discriminator used in record-oriented outputs.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordPayload::Detailed(_) => "detailed",
            RecordPayload::BudgetOnly(_) => "budget",
        }
    }

    /// Total transferred amount regardless of variant.
    pub fn amount_total(&self) -> Decimal {
        match self {
            RecordPayload::Detailed(payment) => payment.amount_total(),
            RecordPayload::BudgetOnly(summary) => summary.transfer_amount,
        }
    }
}
