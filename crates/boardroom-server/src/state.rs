//! Shared application state for the trigger API server.
//!
//! [`AppState`] bundles the components the handlers need: the store for
//! reads, the intervention handler for ad-hoc events, and the reset
//! coordinator. It is generic over the proposer and replication sink so
//! the same surface serves the production pipeline and the test stubs.

use std::sync::Arc;

use boardroom_core::intervene::InterventionHandler;
use boardroom_core::propose::EventProposer;
use boardroom_core::replicate::ReplicationSink;
use boardroom_core::reset::ResetCoordinator;
use boardroom_store::StateStore;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState<P, R> {
    /// Store handle for read endpoints and resets.
    pub store: Arc<StateStore>,
    /// The foreground intervention path.
    pub interventions: Arc<InterventionHandler<P, R>>,
    /// Reset and shutdown coordination.
    pub reset: Arc<ResetCoordinator>,
    /// Company display name for the status page.
    pub company_name: String,
}

impl<P: EventProposer, R: ReplicationSink> AppState<P, R> {
    /// Bundle the shared components for the router.
    pub const fn new(
        store: Arc<StateStore>,
        interventions: Arc<InterventionHandler<P, R>>,
        reset: Arc<ResetCoordinator>,
        company_name: String,
    ) -> Self {
        Self {
            store,
            interventions,
            reset,
            company_name,
        }
    }
}
