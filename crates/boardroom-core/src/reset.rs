//! The reset and cancellation protocol.
//!
//! [`ResetCoordinator`] owns two cooperative flags shared between the
//! scheduler, the intervention handler, and the HTTP surface:
//!
//! - the **cancellation flag**, raised by [`reset`](ResetCoordinator::reset)
//!   after it has rewritten both documents. Whichever in-flight commit
//!   observes the flag first consumes it and discards its own delta, so a
//!   generation pass that started before the reset never overwrites the
//!   freshly reset documents. Cancellation is cooperative: the slow
//!   external call is always allowed to finish, only its effect is thrown
//!   away.
//! - the **stop flag**, a clean-shutdown request checked at the top of
//!   each scheduler cycle.
//!
//! All fields are atomics wrapped in [`std::sync::Arc`] by the callers, so
//! the flags can be shared between the scheduler task and Axum handler
//! tasks without locks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::info;

use boardroom_store::{StateStore, StoreError};
use boardroom_types::EventRecord;

/// Shared cancellation and shutdown state.
#[derive(Debug, Default)]
pub struct ResetCoordinator {
    /// Raised by a reset; consumed by the first commit that observes it.
    cancelled: AtomicBool,
    /// Raised once to request a clean scheduler stop.
    stop_requested: AtomicBool,
}

impl ResetCoordinator {
    /// Create a coordinator with both flags clear.
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Overwrite both documents with the fixed initial value and raise
    /// the cancellation flag.
    ///
    /// The rewrite and the flag raise happen inside the critical section,
    /// so any commit that acquires the lock afterwards is guaranteed to
    /// see the flag before it can write.
    pub async fn reset(&self, store: &StateStore) -> Result<(), StoreError> {
        let guard = store.lock().await;

        let initial = store.initial_state().clone();
        guard.save_state(&initial)?;
        guard.save_history(&[synthetic_reset_entry()])?;
        self.cancelled.store(true, Ordering::Release);
        drop(guard);

        info!("State reset to initial value, in-flight work will be discarded");
        Ok(())
    }

    /// Consume the cancellation flag.
    ///
    /// Returns `true` at most once per raise; the flag auto-clears for
    /// whichever component observes it first.
    pub fn observe_and_clear(&self) -> bool {
        self.cancelled.swap(false, Ordering::AcqRel)
    }

    /// Request a clean scheduler stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// The single history entry a reset leaves behind.
fn synthetic_reset_entry() -> EventRecord {
    EventRecord {
        timestamp: Utc::now().format("%H:%M").to_string(),
        title: String::from("Company re-founded"),
        description: String::from("Everything returned to nothing. The ledger starts over."),
        proposer: String::from("Administrator"),
        source_url: None,
        changes: BTreeMap::new(),
    }
}
