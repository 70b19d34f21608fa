//! Executive roster and social feed persona definitions.
//!
//! The roster seeds prompt construction (personas and speaking styles)
//! and validates the `proposer` field the backend returns: an event
//! attributed to someone outside the roster is re-attributed to the
//! default executive.

use serde::{Deserialize, Serialize};

/// One member of the company's executive bench.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executive {
    /// Display name (e.g. `Cao Cao`).
    pub name: String,
    /// Title in the org chart (e.g. `CEO`).
    pub role: String,
    /// One-line character sketch used in prompts.
    pub persona: String,
    /// Speaking style instructions for commentary generation.
    pub voice: String,
    /// Stances this executive tends toward when reacting to events.
    #[serde(default)]
    pub stances: Vec<String>,
}

/// One recurring account on the company's social feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPersona {
    /// Display name.
    pub name: String,
    /// Account handle (e.g. `@wei_to_moon`).
    pub handle: String,
    /// One-line character sketch used in prompts.
    pub persona: String,
    /// Whether this account is a rival executive rather than a bystander.
    /// Rivals appear on the feed less often but with more bite.
    #[serde(default)]
    pub is_vip: bool,
}

/// Find an executive by name, if they are on the roster.
pub fn find_executive<'a>(roster: &'a [Executive], name: &str) -> Option<&'a Executive> {
    roster.iter().find(|e| e.name == name)
}
