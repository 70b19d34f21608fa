//! The periodic simulation scheduler.
//!
//! A single long-lived background task advances the company on a fixed
//! interval. Each cycle walks the same phases:
//!
//! 1. **Snapshot** -- read the current state (locked, fast).
//! 2. **Generate** -- propose an event against the snapshot, then the
//!    commentary and feed reactions (slow, unlocked; may outlast the
//!    sleep interval, in which case the next cycle simply starts late --
//!    a new cycle never begins before the current commit completes).
//! 3. **Reset checkpoint** -- if the cancellation flag is up, consume it
//!    and discard the draft without writing anything; the reset already
//!    established the new ground truth.
//! 4. **Commit** -- reload the latest state under the lock, apply the
//!    delta once, persist both documents.
//! 5. **Replicate** -- best-effort publication of the result.
//! 6. **Sleep** -- wait out the interval and loop.
//!
//! The loop is a daemon: it only exits when a stop is requested through
//! the [`ResetCoordinator`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use boardroom_store::{StateStore, StoreError};
use boardroom_types::EventRecord;

use crate::commit::{self, CommitRequest, Limits};
use crate::propose::EventProposer;
use crate::replicate::{self, ReplicationSink};
use crate::reset::ResetCoordinator;

/// Timing and bound settings for the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Sleep between cycles.
    pub cycle_interval: Duration,
    /// History and feed bounds passed to the commit protocol.
    pub limits: Limits,
}

/// What one cycle did.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The cycle committed this history entry.
    Committed(EventRecord),
    /// A reset landed while the cycle was generating; the draft was
    /// discarded without touching the documents.
    Discarded,
}

/// The background cycle driver.
pub struct SimulationScheduler<P, R> {
    store: Arc<StateStore>,
    proposer: Arc<P>,
    reset: Arc<ResetCoordinator>,
    sink: Arc<R>,
    settings: SchedulerSettings,
}

impl<P: EventProposer, R: ReplicationSink> SimulationScheduler<P, R> {
    /// Assemble a scheduler over shared components.
    pub const fn new(
        store: Arc<StateStore>,
        proposer: Arc<P>,
        reset: Arc<ResetCoordinator>,
        sink: Arc<R>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            proposer,
            reset,
            sink,
            settings,
        }
    }

    /// Run cycles until a stop is requested.
    pub async fn run(&self) {
        info!(
            interval_secs = self.settings.cycle_interval.as_secs(),
            "Scheduler starting"
        );

        loop {
            if self.reset.is_stop_requested() {
                info!("Scheduler stop requested");
                return;
            }

            match self.run_once().await {
                Ok(CycleOutcome::Committed(record)) => {
                    info!(title = %record.title, "Cycle complete");
                }
                Ok(CycleOutcome::Discarded) => {
                    info!("Cycle discarded after reset");
                }
                Err(e) => {
                    // Persistence failure: log and keep the daemon alive;
                    // the next cycle retries against whatever is on disk.
                    error!(error = %e, "Cycle commit failed");
                }
            }

            tokio::time::sleep(self.settings.cycle_interval).await;
        }
    }

    /// Execute exactly one cycle: snapshot, generate, checkpoint, commit.
    pub async fn run_once(&self) -> Result<CycleOutcome, StoreError> {
        // Phase 1: snapshot (locked, fast).
        let snapshot = self.store.snapshot().await;

        // Phase 2: generation (slow, unlocked).
        let proposal = self.proposer.propose_cycle(&snapshot).await;
        if proposal.is_fallback() {
            warn!("Generation fell back to the no-op event");
        }
        let draft = proposal.into_draft();
        let comments = self.proposer.commentary(&draft).await;
        let reactions = self.proposer.reactions(&draft, &comments).await;

        // Phase 3: reset checkpoint. Consume the flag and walk away; the
        // reset already replaced both documents.
        if self.reset.observe_and_clear() {
            return Ok(CycleOutcome::Discarded);
        }

        // Phase 4: commit against the latest persisted base.
        let committed = commit::commit(
            &self.store,
            CommitRequest {
                draft,
                comments,
                reactions,
            },
            self.settings.limits,
        )
        .await?;

        // Phase 5: best-effort replication.
        replicate::publish_best_effort(&*self.sink, &committed.state, &committed.history)
            .await;

        Ok(CycleOutcome::Committed(committed.record))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use boardroom_store::StorePaths;
    use boardroom_types::state::RESOURCE_FUNDS;
    use boardroom_types::{CompanyState, Delta, EventDraft, InterventionKind, Proposal, Reaction};

    use super::*;
    use crate::propose::StubProposer;
    use crate::replicate::NoOpReplicator;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let unique = format!(
            "boardroom_sched_{tag}_{}_{:?}",
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
            CompanyState::with_resources(BTreeMap::from([
                (String::from("funds"), 3000),
                (String::from("morale"), 50),
                (String::from("risk"), 10),
            ])),
        ))
    }

    fn cleanup(tag: &str) {
        std::fs::remove_dir_all(temp_dir(tag)).ok();
    }

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            cycle_interval: Duration::from_millis(1),
            limits: Limits::default(),
        }
    }

    fn scheduler_with(
        store: &Arc<StateStore>,
        reset: &Arc<ResetCoordinator>,
        changes: Delta,
    ) -> SimulationScheduler<StubProposer, NoOpReplicator> {
        SimulationScheduler::new(
            Arc::clone(store),
            Arc::new(StubProposer::new(changes, String::from("Cao Cao"))),
            Arc::clone(reset),
            Arc::new(NoOpReplicator),
            settings(),
        )
    }

    #[tokio::test]
    async fn run_once_commits_the_proposed_delta() {
        let store = temp_store("commits");
        let reset = Arc::new(ResetCoordinator::new());
        let scheduler = scheduler_with(
            &store,
            &reset,
            Delta::from([(String::from("funds"), -10)]),
        );

        let outcome = scheduler.run_once().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Committed(_)));
        assert_eq!(store.snapshot().await.resource(RESOURCE_FUNDS), 2990);
        cleanup("commits");
    }

    #[tokio::test]
    async fn pending_cycle_discards_after_reset() {
        let store = temp_store("discard");
        let reset = Arc::new(ResetCoordinator::new());

        // Dirty the state, then reset: the flag goes up.
        let scheduler = scheduler_with(
            &store,
            &reset,
            Delta::from([(String::from("funds"), -10)]),
        );
        scheduler.run_once().await.unwrap();
        reset.reset(&store).await.unwrap();

        // The next cycle observes the flag and must not write.
        let outcome = scheduler.run_once().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Discarded));

        let guard = store.lock().await;
        assert_eq!(guard.load_state(), *store.initial_state());
        let history = guard.load_history();
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.first().map(|r| r.title.as_str()),
            Some("Company re-founded")
        );
        drop(guard);

        // The flag was consumed; the cycle after that commits normally.
        let outcome = scheduler.run_once().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Committed(_)));
        cleanup("discard");
    }

    #[tokio::test]
    async fn run_exits_on_stop_request() {
        let store = temp_store("stop");
        let reset = Arc::new(ResetCoordinator::new());
        reset.request_stop();
        let scheduler = scheduler_with(&store, &reset, Delta::new());

        // Must return promptly instead of looping forever.
        tokio::time::timeout(Duration::from_secs(1), scheduler.run())
            .await
            .unwrap();
        cleanup("stop");
    }

    /// A proposer that commits a competing delta while "generating",
    /// simulating an intervention landing between another cycle's
    /// snapshot and commit phases.
    struct InterleavingProposer {
        store: Arc<StateStore>,
    }

    impl EventProposer for InterleavingProposer {
        async fn propose_cycle(&self, _snapshot: &CompanyState) -> Proposal {
            let competing = EventDraft {
                title: String::from("competing intervention"),
                description: String::from("landed mid-generation"),
                proposer: String::from("The Voice Above"),
                source_url: None,
                changes: Delta::from([(String::from("funds"), -500)]),
            };
            commit::commit(
                &self.store,
                CommitRequest {
                    draft: competing,
                    comments: BTreeMap::new(),
                    reactions: Vec::new(),
                },
                Limits::default(),
            )
            .await
            .map(|_| ())
            .unwrap_or(());

            Proposal::Drafted(EventDraft {
                title: String::from("cycle event"),
                description: String::from("computed against a now-stale snapshot"),
                proposer: String::from("Cao Cao"),
                source_url: None,
                changes: Delta::from([(String::from("funds"), -10)]),
            })
        }

        async fn propose_intervention(
            &self,
            _kind: InterventionKind,
            _snapshot: &CompanyState,
        ) -> Proposal {
            Proposal::Fallback(EventDraft {
                title: String::new(),
                description: String::new(),
                proposer: String::new(),
                source_url: None,
                changes: Delta::new(),
            })
        }

        async fn commentary(&self, _draft: &EventDraft) -> BTreeMap<String, String> {
            BTreeMap::new()
        }

        async fn reactions(
            &self,
            _draft: &EventDraft,
            _comments: &BTreeMap<String, String>,
        ) -> Vec<Reaction> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn commit_lands_on_latest_base_not_the_snapshot() {
        let store = temp_store("latest");
        let reset = Arc::new(ResetCoordinator::new());
        let scheduler = SimulationScheduler::new(
            Arc::clone(&store),
            Arc::new(InterleavingProposer {
                store: Arc::clone(&store),
            }),
            reset,
            Arc::new(NoOpReplicator),
            settings(),
        );

        scheduler.run_once().await.unwrap();

        // Snapshot said 3000; the competing -500 committed mid-cycle and
        // must not be lost: 3000 - 500 - 10.
        assert_eq!(store.snapshot().await.resource(RESOURCE_FUNDS), 2490);

        let guard = store.lock().await;
        let history = guard.load_history();
        drop(guard);
        assert_eq!(history.len(), 2);
        assert_eq!(
            history.first().map(|r| r.title.as_str()),
            Some("cycle event")
        );
        assert_eq!(
            history.last().map(|r| r.title.as_str()),
            Some("competing intervention")
        );
        cleanup("latest");
    }
}
