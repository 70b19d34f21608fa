//! The [`EventProposer`] seam between the engine and the slow generation
//! pipeline.
//!
//! The scheduler and the intervention handler only ever see this trait.
//! The real implementation (LLM prompts over HTTP) lives in
//! `boardroom-pipeline`; [`StubProposer`] provides a deterministic
//! implementation so the synchronization engine can be exercised
//! end-to-end in tests without a backend.
//!
//! Every method takes a read-only snapshot and must not touch the store
//! lock: the whole point of the seam is that these calls may take seconds.
//! Failures are absorbed inside the implementation -- a proposal is always
//! returned, with the fallback branch made visible via
//! [`Proposal::Fallback`].

use std::collections::BTreeMap;
use std::future::Future;

use boardroom_types::{CompanyState, Delta, EventDraft, InterventionKind, Proposal, Reaction};

/// A source of generated events and their auxiliary text.
///
/// All futures are `Send` so interventions can run on spawned tasks.
pub trait EventProposer: Send + Sync {
    /// Propose the next scheduled event against a state snapshot.
    fn propose_cycle(
        &self,
        snapshot: &CompanyState,
    ) -> impl Future<Output = Proposal> + Send;

    /// Propose an ad-hoc intervention event of the given kind.
    fn propose_intervention(
        &self,
        kind: InterventionKind,
        snapshot: &CompanyState,
    ) -> impl Future<Output = Proposal> + Send;

    /// Generate per-executive commentary on a drafted event.
    ///
    /// Best-effort: implementations degrade to placeholder text rather
    /// than failing.
    fn commentary(
        &self,
        draft: &EventDraft,
    ) -> impl Future<Output = BTreeMap<String, String>> + Send;

    /// Generate social feed reactions to a drafted event.
    ///
    /// Best-effort, like [`commentary`](Self::commentary).
    fn reactions(
        &self,
        draft: &EventDraft,
        comments: &BTreeMap<String, String>,
    ) -> impl Future<Output = Vec<Reaction>> + Send;
}

/// A deterministic proposer for tests and dry runs.
///
/// Always drafts the same event with the configured delta, attributed to
/// the configured proposer, with no commentary and no reactions.
#[derive(Debug, Clone)]
pub struct StubProposer {
    /// The delta every proposal carries.
    pub changes: Delta,
    /// The actor every proposal is attributed to.
    pub proposer: String,
}

impl StubProposer {
    /// Create a stub that always proposes the given delta.
    pub const fn new(changes: Delta, proposer: String) -> Self {
        Self { changes, proposer }
    }

    fn draft(&self, title: &str) -> EventDraft {
        EventDraft {
            title: title.to_owned(),
            description: String::from("Scripted event."),
            proposer: self.proposer.clone(),
            source_url: None,
            changes: self.changes.clone(),
        }
    }
}

impl EventProposer for StubProposer {
    async fn propose_cycle(&self, _snapshot: &CompanyState) -> Proposal {
        Proposal::Drafted(self.draft("Scheduled cycle"))
    }

    async fn propose_intervention(
        &self,
        kind: InterventionKind,
        _snapshot: &CompanyState,
    ) -> Proposal {
        Proposal::Drafted(self.draft(kind.as_str()))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_proposes_configured_delta() {
        let changes = Delta::from([(String::from("funds"), -10)]);
        let stub = StubProposer::new(changes.clone(), String::from("Cao Cao"));

        let proposal = stub.propose_cycle(&CompanyState::default()).await;
        assert!(!proposal.is_fallback());
        assert_eq!(proposal.into_draft().changes, changes);
    }

    #[tokio::test]
    async fn stub_intervention_titles_by_kind() {
        let stub = StubProposer::new(Delta::new(), String::from("The Voice Above"));
        let proposal = stub
            .propose_intervention(InterventionKind::Audit, &CompanyState::default())
            .await;
        assert_eq!(proposal.into_draft().title, "audit");
    }
}
