//! The mutable company state document and resource deltas.
//!
//! [`CompanyState`] is the single unit of truth for the simulation. It is
//! persisted as one JSON document and mutated only inside the store lock,
//! by applying exactly one [`Delta`] per commit. The derived label fields
//! are recomputed from the resources on every commit so they are never
//! observed stale from inside the lock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A signed adjustment to the named integer resources.
///
/// Produced by generation and immutable once computed. Keys missing from
/// the delta are treated as a zero adjustment; keys missing from the state
/// are created at zero before the adjustment is applied.
pub type Delta = BTreeMap<String, i64>;

/// The resource key for company funds.
pub const RESOURCE_FUNDS: &str = "funds";
/// The resource key for employee morale.
pub const RESOURCE_MORALE: &str = "morale";
/// The resource key for scandal risk.
pub const RESOURCE_RISK: &str = "risk";

/// One short reaction on the company's social feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Display name of the poster.
    pub name: String,
    /// The poster's handle (e.g. `@meat_love`).
    pub handle: String,
    /// The reaction text.
    pub content: String,
    /// Whether the poster is a rival executive rather than a bystander.
    pub is_vip: bool,
    /// Wall-clock `HH:MM` timestamp of the reaction.
    pub timestamp: String,
}

/// The single mutable company record.
///
/// Serialized as a flat keyed JSON document. All fields default so that a
/// partially written or legacy document still deserializes; the store
/// treats anything that fails to deserialize as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyState {
    /// Named integer resources (funds, morale, risk, ...). Unbounded
    /// signed integers; application of a delta is saturating.
    #[serde(default)]
    pub resources: BTreeMap<String, i64>,

    /// Public reputation label, derived from the resources on commit.
    #[serde(default)]
    pub reputation: String,

    /// Analyst rating label, derived from the resources on commit.
    #[serde(default)]
    pub rating: String,

    /// Per-executive short commentary, wholly replaced on every commit.
    #[serde(default)]
    pub comments: BTreeMap<String, String>,

    /// Recent social feed reactions, most-recent-first, bounded.
    #[serde(default)]
    pub feed: Vec<Reaction>,
}

impl CompanyState {
    /// Build the initial state from a set of starting resources.
    ///
    /// Labels are left empty; the first commit (or the caller) is expected
    /// to recompute them so they are consistent with the resources.
    pub fn with_resources(resources: BTreeMap<String, i64>) -> Self {
        Self {
            resources,
            ..Self::default()
        }
    }

    /// Read a resource value, treating an absent key as zero.
    pub fn resource(&self, name: &str) -> i64 {
        self.resources.get(name).copied().unwrap_or(0)
    }

    /// Prepend new feed reactions and truncate to `cap` entries.
    ///
    /// The newest reactions go first; anything beyond the cap is silently
    /// dropped from the tail.
    pub fn merge_feed(&mut self, newest: Vec<Reaction>, cap: usize) {
        let mut feed = newest;
        feed.append(&mut self.feed);
        feed.truncate(cap);
        self.feed = feed;
    }
}
