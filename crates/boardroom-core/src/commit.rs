//! Delta application and the locked commit protocol.
//!
//! A commit is the only way a delta becomes durable. The protocol is:
//! acquire the store lock, **reload the latest persisted state** (never
//! the snapshot generation ran against), apply the delta exactly once on
//! top of that base, recompute the derived labels, replace the commentary,
//! merge the feed, append the bounded history entry, and persist both
//! documents before the lock is released. Commits are linearized by the
//! store lock: for any two commits, one fully completes (both documents
//! written) before the other's critical section begins.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use boardroom_store::{StateStore, StoreError};
use boardroom_types::state::{RESOURCE_FUNDS, RESOURCE_MORALE, RESOURCE_RISK};
use boardroom_types::{CompanyState, Delta, EventDraft, EventRecord, Reaction};

/// Risk level above which the company is publicly on fire.
const RISK_CRITICAL: i64 = 60;
/// Morale level below which the company counts as a sweatshop.
const MORALE_FLOOR: i64 = 30;
/// Funds level above which analysts relax.
const FUNDS_COMFORTABLE: i64 = 5000;

/// Bounds on the two rolling collections.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum number of history entries retained.
    pub history_cap: usize,
    /// Maximum number of feed reactions retained.
    pub feed_cap: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            history_cap: 30,
            feed_cap: 30,
        }
    }
}

/// Apply a delta to the resource map with saturating addition.
///
/// Keys absent from the delta are untouched; keys absent from the state
/// are created at zero first.
pub fn apply_delta(resources: &mut BTreeMap<String, i64>, delta: &Delta) {
    for (name, adjustment) in delta {
        let slot = resources.entry(name.clone()).or_insert(0);
        *slot = slot.saturating_add(*adjustment);
    }
}

/// Recompute the derived reputation and rating labels from the resources.
///
/// Deterministic, and called inside every commit so the labels are never
/// observed stale from inside the lock. Risk outranks morale outranks
/// funds when several thresholds trip at once.
pub fn evaluate_labels(state: &mut CompanyState) {
    let funds = state.resource(RESOURCE_FUNDS);
    let morale = state.resource(RESOURCE_MORALE);
    let risk = state.resource(RESOURCE_RISK);

    let (reputation, rating) = if risk > RISK_CRITICAL {
        ("Trending for the wrong reasons", "Critical")
    } else if morale < MORALE_FLOOR {
        ("Sweatshop", "Declining")
    } else if funds > FUNDS_COMFORTABLE {
        ("Blue chip", "Secure")
    } else {
        ("Wait and see", "Stable")
    };

    state.reputation = reputation.to_owned();
    state.rating = rating.to_owned();
}

/// Everything a commit folds into the documents.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The event whose delta is applied.
    pub draft: EventDraft,
    /// Per-executive commentary, wholly replacing the previous set.
    pub comments: BTreeMap<String, String>,
    /// New feed reactions, prepended to the bounded feed.
    pub reactions: Vec<Reaction>,
}

/// The durable result of a successful commit.
///
/// Carries copies of both post-commit documents so callers can hand them
/// to a replication sink without re-acquiring the lock.
#[derive(Debug, Clone)]
pub struct Committed {
    /// The history entry that was appended.
    pub record: EventRecord,
    /// The state document as persisted.
    pub state: CompanyState,
    /// The history document as persisted.
    pub history: Vec<EventRecord>,
}

/// Run the commit protocol for one event.
///
/// The whole sequence happens inside one critical section so the two
/// documents are never observed with one updated and not the other.
pub async fn commit(
    store: &StateStore,
    request: CommitRequest,
    limits: Limits,
) -> Result<Committed, StoreError> {
    let guard = store.lock().await;

    // Reload the latest base: another writer may have committed while
    // generation was running against the snapshot.
    let mut state = guard.load_state();
    let mut history = guard.load_history();

    apply_delta(&mut state.resources, &request.draft.changes);
    evaluate_labels(&mut state);
    state.comments = request.comments;
    state.merge_feed(request.reactions, limits.feed_cap);

    let record = EventRecord::from_draft(request.draft, Utc::now());
    history.insert(0, record.clone());
    history.truncate(limits.history_cap);

    guard.save_state(&state)?;
    guard.save_history(&history)?;
    drop(guard);

    info!(
        title = %record.title,
        proposer = %record.proposer,
        funds = state.resource(RESOURCE_FUNDS),
        morale = state.resource(RESOURCE_MORALE),
        risk = state.resource(RESOURCE_RISK),
        "Event committed"
    );

    Ok(Committed {
        record,
        state,
        history,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boardroom_store::StorePaths;

    use super::*;

    fn delta(pairs: &[(&str, i64)]) -> Delta {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), *v))
            .collect()
    }

    fn initial_state() -> CompanyState {
        CompanyState::with_resources(
            delta(&[("funds", 3000), ("morale", 50), ("risk", 10)]),
        )
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let unique = format!(
            "boardroom_commit_{tag}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        std::env::temp_dir().join(unique)
    }

    fn temp_store(tag: &str) -> StateStore {
        let dir = temp_dir(tag);
        std::fs::create_dir_all(&dir).unwrap();
        StateStore::new(
            StorePaths {
                state: dir.join("state.json"),
                history: dir.join("history.json"),
            },
            initial_state(),
        )
    }

    fn cleanup(tag: &str) {
        std::fs::remove_dir_all(temp_dir(tag)).ok();
    }

    fn draft(title: &str, changes: Delta) -> EventDraft {
        EventDraft {
            title: title.to_owned(),
            description: String::from("test event"),
            proposer: String::from("Cao Cao"),
            source_url: None,
            changes,
        }
    }

    fn request(title: &str, changes: Delta) -> CommitRequest {
        CommitRequest {
            draft: draft(title, changes),
            comments: BTreeMap::new(),
            reactions: Vec::new(),
        }
    }

    #[test]
    fn apply_delta_adds_and_creates_keys() {
        let mut resources = delta(&[("funds", 3000)]);
        apply_delta(&mut resources, &delta(&[("funds", -500), ("risk", 20)]));
        assert_eq!(resources.get("funds"), Some(&2500));
        assert_eq!(resources.get("risk"), Some(&20));
    }

    #[test]
    fn apply_delta_saturates_at_extremes() {
        let mut resources = delta(&[("funds", i64::MAX)]);
        apply_delta(&mut resources, &delta(&[("funds", 1)]));
        assert_eq!(resources.get("funds"), Some(&i64::MAX));
    }

    #[test]
    fn empty_delta_changes_nothing() {
        let mut resources = delta(&[("funds", 3000)]);
        apply_delta(&mut resources, &Delta::new());
        assert_eq!(resources.get("funds"), Some(&3000));
    }

    #[test]
    fn labels_prioritize_risk_then_morale_then_funds() {
        let mut state = CompanyState::with_resources(
            delta(&[("funds", 9000), ("morale", 10), ("risk", 80)]),
        );
        evaluate_labels(&mut state);
        assert_eq!(state.rating, "Critical");

        state.resources.insert(String::from("risk"), 0);
        evaluate_labels(&mut state);
        assert_eq!(state.rating, "Declining");

        state.resources.insert(String::from("morale"), 50);
        evaluate_labels(&mut state);
        assert_eq!(state.rating, "Secure");

        state.resources.insert(String::from("funds"), 100);
        evaluate_labels(&mut state);
        assert_eq!(state.rating, "Stable");
    }

    #[tokio::test]
    async fn commit_applies_against_latest_base() {
        let store = temp_store("latest_base");

        // First commit lands while a second delta is still "in flight".
        commit(&store, request("a", delta(&[("funds", -10)])), Limits::default())
            .await
            .unwrap();
        let committed =
            commit(&store, request("b", delta(&[("funds", -500)])), Limits::default())
                .await
                .unwrap();

        // Both deltas applied exactly once: 3000 - 10 - 500.
        assert_eq!(committed.state.resource("funds"), 2490);
        assert_eq!(committed.history.len(), 2);
        assert_eq!(committed.history.first().map(|r| r.title.as_str()), Some("b"));
        cleanup("latest_base");
    }

    #[tokio::test]
    async fn commit_recomputes_labels_and_replaces_comments() {
        let store = temp_store("labels");

        let mut req = request("spike", delta(&[("risk", 100)]));
        req.comments
            .insert(String::from("Guo Jia"), String::from("lol"));
        let committed = commit(&store, req, Limits::default()).await.unwrap();

        assert_eq!(committed.state.rating, "Critical");
        assert_eq!(
            committed.state.comments.get("Guo Jia").map(String::as_str),
            Some("lol")
        );

        // Next commit wholly replaces the commentary.
        let committed = commit(
            &store,
            request("calm", delta(&[("risk", -100)])),
            Limits::default(),
        )
        .await
        .unwrap();
        assert!(committed.state.comments.is_empty());
        cleanup("labels");
    }

    #[tokio::test]
    async fn history_is_bounded_and_most_recent_first() {
        let store = temp_store("bounded");
        let limits = Limits {
            history_cap: 5,
            feed_cap: 30,
        };

        for i in 0..8 {
            commit(&store, request(&format!("event-{i}"), Delta::new()), limits)
                .await
                .unwrap();
        }

        let guard = store.lock().await;
        let history = guard.load_history();
        drop(guard);

        assert_eq!(history.len(), 5);
        let titles: Vec<&str> = history.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["event-7", "event-6", "event-5", "event-4", "event-3"]);
        cleanup("bounded");
    }

    #[tokio::test]
    async fn no_lost_updates_under_concurrent_commits() {
        let store = std::sync::Arc::new(temp_store("concurrent"));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let store = std::sync::Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                commit(
                    &store,
                    request("cycle", delta(&[("funds", -10)])),
                    Limits::default(),
                )
                .await
            }));
        }
        for _ in 0..3 {
            let store = std::sync::Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                commit(
                    &store,
                    request("intervention", delta(&[("funds", -500)])),
                    Limits::default(),
                )
                .await
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // 3000 - 4*10 - 3*500, regardless of commit order.
        let final_state = store.snapshot().await;
        assert_eq!(final_state.resource("funds"), 1460);

        let guard = store.lock().await;
        assert_eq!(guard.load_history().len(), 7);
        drop(guard);
        cleanup("concurrent");
    }
}
