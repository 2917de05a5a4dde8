//! CLI error types and conversions

use crate::catalog::CatalogError;
use crate::collector::{CollectError, InvariantViolation, PlanError};
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Region catalog error
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Task planning error
    #[error("planning error: {0}")]
    Plan(#[from] PlanError),

    /// Collection error
    #[error("collection error: {0}")]
    Collect(#[from] CollectError),

    /// Invariant violation
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Pre-flight failure before any collection task executed
    #[error("pre-flight failure: {0}")]
    Preflight(String),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
