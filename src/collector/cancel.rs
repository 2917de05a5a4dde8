//! Cooperative cancellation of a collection run.
//!
//! A [`CancelToken`] is a cheap clonable handle shared between the signal
//! handler, the orchestrator, and every worker slot. Cancelling it stops
//! the submission of new tasks; tasks already claimed still reach a
//! terminal state, so the run finalizes with a consistent manifest instead
//! of half-written artifacts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Clonable cancellation handle. All clones observe the same state, and
/// cancellation is sticky: once set it never clears.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the run. Wakes every waiter; later calls are no-ops.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation is requested; immediately if it already
    /// was. Registers with the notifier before re-checking the flag, so a
    /// cancel landing between the two cannot be missed.
    pub async fn cancelled(&self) {
        let notified = self.state.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
