//! Operator interventions.
//!
//! An intervention is an on-demand event of a chosen kind, injected from
//! the HTTP surface while the scheduler keeps running. It walks the same
//! snapshot / generate / checkpoint / commit phases as a scheduled cycle
//! and goes through the exact same commit protocol, so an intervention
//! and a concurrent cycle can never lose each other's delta.

use std::sync::Arc;

use tracing::{info, warn};

use boardroom_store::{StateStore, StoreError};
use boardroom_types::{EventRecord, InterventionKind};

use crate::commit::{self, CommitRequest, Limits};
use crate::propose::EventProposer;
use crate::replicate::{self, ReplicationSink};
use crate::reset::ResetCoordinator;

/// How an intervention request ended.
#[derive(Debug, Clone)]
pub enum InterventionOutcome {
    /// The intervention committed this history entry.
    Committed(EventRecord),
    /// A reset landed while the intervention was generating; the draft
    /// was discarded and nothing was written.
    Interrupted,
}

/// Runs intervention requests against the shared store.
pub struct InterventionHandler<P, R> {
    store: Arc<StateStore>,
    proposer: Arc<P>,
    reset: Arc<ResetCoordinator>,
    sink: Arc<R>,
    limits: Limits,
}

impl<P: EventProposer, R: ReplicationSink> InterventionHandler<P, R> {
    /// Assemble a handler over shared components.
    pub const fn new(
        store: Arc<StateStore>,
        proposer: Arc<P>,
        reset: Arc<ResetCoordinator>,
        sink: Arc<R>,
        limits: Limits,
    ) -> Self {
        Self {
            store,
            proposer,
            reset,
            sink,
            limits,
        }
    }

    /// Generate and commit one intervention event of the given kind.
    ///
    /// Multiple interventions may generate concurrently; the commit
    /// protocol serializes their effects.
    pub async fn intervene(
        &self,
        kind: InterventionKind,
    ) -> Result<InterventionOutcome, StoreError> {
        info!(kind = kind.as_str(), "Intervention requested");

        let snapshot = self.store.snapshot().await;
        let proposal = self.proposer.propose_intervention(kind, &snapshot).await;
        if proposal.is_fallback() {
            warn!(kind = kind.as_str(), "Intervention fell back to the no-op event");
        }
        let draft = proposal.into_draft();
        let comments = self.proposer.commentary(&draft).await;
        let reactions = self.proposer.reactions(&draft, &comments).await;

        // Same checkpoint as the scheduler: a reset that raced this
        // generation wins, and the draft is thrown away.
        if self.reset.observe_and_clear() {
            info!(kind = kind.as_str(), "Intervention interrupted by reset");
            return Ok(InterventionOutcome::Interrupted);
        }

        let committed = commit::commit(
            &self.store,
            CommitRequest {
                draft,
                comments,
                reactions,
            },
            self.limits,
        )
        .await?;

        replicate::publish_best_effort(&*self.sink, &committed.state, &committed.history)
            .await;

        Ok(InterventionOutcome::Committed(committed.record))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::collections::BTreeMap;

    use boardroom_store::StorePaths;
    use boardroom_types::state::RESOURCE_FUNDS;
    use boardroom_types::{CompanyState, Delta};

    use super::*;
    use crate::propose::StubProposer;
    use crate::replicate::NoOpReplicator;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let unique = format!(
            "boardroom_intervene_{tag}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        std::env::temp_dir().join(unique)
    }

    fn temp_store(tag: &str) -> Arc<StateStore> {
        let dir = temp_dir(tag);
        std::fs::create_dir_all(&dir).unwrap();
        Arc::new(StateStore::new(
            StorePaths {
                state: dir.join("state.json"),
                history: dir.join("history.json"),
            },
            CompanyState::with_resources(BTreeMap::from([(String::from("funds"), 3000)])),
        ))
    }

    fn cleanup(tag: &str) {
        std::fs::remove_dir_all(temp_dir(tag)).ok();
    }

    fn handler(
        store: &Arc<StateStore>,
        reset: &Arc<ResetCoordinator>,
        changes: Delta,
    ) -> InterventionHandler<StubProposer, NoOpReplicator> {
        InterventionHandler::new(
            Arc::clone(store),
            Arc::new(StubProposer::new(changes, String::from("The Voice Above"))),
            Arc::clone(reset),
            Arc::new(NoOpReplicator),
            Limits::default(),
        )
    }

    #[tokio::test]
    async fn intervention_commits_and_records_history() {
        let store = temp_store("commits");
        let reset = Arc::new(ResetCoordinator::new());
        let handler = handler(
            &store,
            &reset,
            Delta::from([(String::from("funds"), -250)]),
        );

        let outcome = handler
            .intervene(InterventionKind::Rumor)
            .await
            .unwrap();
        let InterventionOutcome::Committed(record) = outcome else {
            panic!("expected a committed intervention");
        };
        assert_eq!(record.title, "rumor");
        assert_eq!(record.proposer, "The Voice Above");
        assert_eq!(store.snapshot().await.resource(RESOURCE_FUNDS), 2750);
        cleanup("commits");
    }

    #[tokio::test]
    async fn intervention_is_interrupted_by_a_pending_reset() {
        let store = temp_store("interrupted");
        let reset = Arc::new(ResetCoordinator::new());
        let handler = handler(
            &store,
            &reset,
            Delta::from([(String::from("funds"), -250)]),
        );

        reset.reset(&store).await.unwrap();

        let outcome = handler
            .intervene(InterventionKind::Edict)
            .await
            .unwrap();
        assert!(matches!(outcome, InterventionOutcome::Interrupted));

        // The reset documents survived untouched.
        let guard = store.lock().await;
        assert_eq!(guard.load_state().resource(RESOURCE_FUNDS), 3000);
        assert_eq!(guard.load_history().len(), 1);
        drop(guard);
        cleanup("interrupted");
    }
}
