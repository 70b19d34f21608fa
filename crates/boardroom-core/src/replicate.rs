//! The post-commit replication seam.
//!
//! After a successful commit (and after a reset) the engine hands the
//! current documents to a [`ReplicationSink`] for external publication.
//! Replication is fully isolated from store correctness: failures are
//! logged and swallowed, never rolled back or retried, and never surfaced
//! to the caller of commit.

use std::future::Future;

use tracing::warn;

use boardroom_types::{CompanyState, EventRecord};

/// Error raised by a replication sink.
///
/// Always absorbed by [`publish_best_effort`]; the type exists so sinks
/// can report *why* publication failed in the log.
#[derive(Debug, thiserror::Error)]
#[error("replication failed: {0}")]
pub struct ReplicationError(pub String);

/// Receives the post-commit documents for external publication.
pub trait ReplicationSink: Send + Sync {
    /// Publish the current state and history.
    fn publish(
        &self,
        state: &CompanyState,
        history: &[EventRecord],
    ) -> impl Future<Output = Result<(), ReplicationError>> + Send;
}

/// A sink that publishes nowhere. Used in tests and when replication is
/// disabled by configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReplicator;

impl ReplicationSink for NoOpReplicator {
    async fn publish(
        &self,
        _state: &CompanyState,
        _history: &[EventRecord],
    ) -> Result<(), ReplicationError> {
        Ok(())
    }
}

/// Publish and absorb any failure with a warning.
pub async fn publish_best_effort<R: ReplicationSink>(
    sink: &R,
    state: &CompanyState,
    history: &[EventRecord],
) {
    if let Err(e) = sink.publish(state, history).await {
        warn!(error = %e, "replication failed, continuing");
    }
}
