//! Minimum spacing between remote requests.
//!
//! The reporting service publishes no rate-limit contract, so the collector
//! keeps a fixed minimum gap between the requests it issues. The pacer is
//! the only shared mutable state on the request path: the last-dispatch
//! instant lives behind an async mutex, and the lock is held across the
//! wait so concurrent callers of one pacer serialize their spacing
//! decisions instead of racing past each other.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum interval between consecutive requests.
#[derive(Debug)]
pub struct Pacer {
    min_spacing: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Create a pacer with the given minimum spacing.
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Configured minimum spacing.
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Wait until the minimum spacing since the previous dispatch has
    /// elapsed, then record this dispatch. Called before every attempt,
    /// retries included.
    pub async fn pace(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_spacing {
                tokio::time::sleep(self.min_spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
