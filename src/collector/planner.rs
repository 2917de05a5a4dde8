//! Expansion of a collection request into an ordered task list.

use crate::catalog::{CatalogError, RegionCatalog, RegionSelector};
use crate::collector::task::FetchTask;
use crate::Period;
use tracing::debug;

/// Planning errors. All are pre-flight: nothing has touched the network
/// when one of these is raised.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Selector resolution failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The same period was requested twice. Overlapping requests are a
    /// caller error, not something to deduplicate silently.
    #[error("period {0} requested more than once")]
    DuplicatePeriod(Period),

    /// No periods were requested
    #[error("no periods requested")]
    EmptyPeriods,

    /// A selected region has no municipality directory loaded
    #[error("no municipalities known for region {0}")]
    EmptyRegion(String),
}

/// Expands (regions × municipalities × periods) into sequence-numbered
/// tasks.
///
/// Ordering is the contract progress output and manifests rely on: region
/// order from the catalog, municipality order as the catalog returns them,
/// then period order as given by the caller.
pub struct TaskPlanner<'a> {
    catalog: &'a RegionCatalog,
}

impl<'a> TaskPlanner<'a> {
    /// Create a planner over the given catalog.
    pub fn new(catalog: &'a RegionCatalog) -> Self {
        Self { catalog }
    }

    /// Produce the ordered task list for a selector and period list.
    ///
    /// Regions vary from a handful of municipalities to hundreds, so the
    /// total count comes from enumerating the actual directory, never from
    /// estimates.
    pub fn plan(
        &self,
        selector: &RegionSelector,
        periods: &[Period],
    ) -> Result<Vec<FetchTask>, PlanError> {
        if periods.is_empty() {
            return Err(PlanError::EmptyPeriods);
        }
        for (i, period) in periods.iter().enumerate() {
            if periods[..i].contains(period) {
                return Err(PlanError::DuplicatePeriod(*period));
            }
        }

        let regions = self.catalog.resolve(selector)?;
        let mut tasks = Vec::new();
        let mut seq: u64 = 0;

        for region in regions {
            if region.municipalities.is_empty() {
                return Err(PlanError::EmptyRegion(region.code.clone()));
            }
            for municipality in &region.municipalities {
                for period in periods {
                    tasks.push(FetchTask {
                        seq,
                        region_code: region.code.clone(),
                        region_ibge: region.ibge_code.clone(),
                        region_name: region.name.clone(),
                        municipality_code: municipality.ibge_code.clone(),
                        municipality_name: municipality.name.clone(),
                        period: *period,
                    });
                    seq += 1;
                }
            }
        }

        debug!(tasks = tasks.len(), periods = periods.len(), "plan expanded");
        Ok(tasks)
    }
}
