//! Generated events, proposals, and the committed event log entry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::Delta;

/// An event produced by a generation pass, not yet committed.
///
/// The draft carries everything the commit protocol needs: the flavor
/// text, the proposing actor, an optional external reference, and the
/// resource delta. A draft is immutable once the pipeline returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Short event title.
    pub title: String,
    /// What happened, in one or two sentences.
    pub description: String,
    /// The executive (or outside force) the event is attributed to.
    pub proposer: String,
    /// Link to the news article the event riffed on, if any.
    #[serde(default)]
    pub source_url: Option<String>,
    /// The signed resource adjustments this event causes.
    #[serde(default)]
    pub changes: Delta,
}

/// The result of a generation pass.
///
/// A flaky backend never stalls the state machine: when generation or
/// parsing fails, the pipeline takes the visible [`Proposal::Fallback`]
/// branch with a fixed deterministic draft instead of raising an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proposal {
    /// The backend produced a usable structured payload.
    Drafted(EventDraft),
    /// Generation or parsing failed; this is the fixed no-op substitute.
    Fallback(EventDraft),
}

impl Proposal {
    /// Whether this proposal is the deterministic fallback.
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Unwrap the draft regardless of which branch produced it.
    pub fn into_draft(self) -> EventDraft {
        match self {
            Self::Drafted(draft) | Self::Fallback(draft) => draft,
        }
    }
}

/// One immutable entry in the bounded event history document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Wall-clock `HH:MM` timestamp of the commit.
    pub timestamp: String,
    /// Short event title.
    pub title: String,
    /// What happened.
    pub description: String,
    /// The actor the event is attributed to.
    pub proposer: String,
    /// Link to the seeding news article, if any.
    #[serde(default)]
    pub source_url: Option<String>,
    /// The delta that produced this entry.
    #[serde(default)]
    pub changes: Delta,
}

impl EventRecord {
    /// Stamp a draft into a history entry at the given commit time.
    pub fn from_draft(draft: EventDraft, committed_at: DateTime<Utc>) -> Self {
        Self {
            timestamp: committed_at.format("%H:%M").to_string(),
            title: draft.title,
            description: draft.description,
            proposer: draft.proposer,
            source_url: draft.source_url,
            changes: draft.changes,
        }
    }
}

/// The named ad-hoc intervention kinds a foreground caller can trigger.
///
/// Each kind maps to its own prompt policy in the pipeline but shares the
/// same delta contract and commit path as a scheduled cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionKind {
    /// A paid astroturf campaign: morale up, funds and credibility down.
    Rumor,
    /// An internal audit that may uncover comedic fraud.
    Audit,
    /// A capricious decree from above.
    Edict,
}

impl InterventionKind {
    /// The lowercase wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rumor => "rumor",
            Self::Audit => "audit",
            Self::Edict => "edict",
        }
    }
}

impl fmt::Display for InterventionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an unknown intervention kind name is parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown intervention kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for InterventionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rumor" => Ok(Self::Rumor),
            "audit" => Ok(Self::Audit),
            "edict" => Ok(Self::Edict),
            other => Err(UnknownKind(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn proposal_fallback_is_visible() {
        let draft = EventDraft {
            title: String::from("A quiet day"),
            description: String::from("Nothing of note."),
            proposer: String::from("Xun You"),
            source_url: None,
            changes: BTreeMap::new(),
        };
        let proposal = Proposal::Fallback(draft.clone());
        assert!(proposal.is_fallback());
        assert_eq!(proposal.into_draft(), draft);
    }

    #[test]
    fn record_from_draft_formats_timestamp() {
        let draft = EventDraft {
            title: String::from("IPO rumors"),
            description: String::from("The street is talking."),
            proposer: String::from("Cao Cao"),
            source_url: Some(String::from("https://example.com/article")),
            changes: BTreeMap::from([(String::from("funds"), 500)]),
        };
        let at = chrono::DateTime::parse_from_rfc3339("2026-01-02T09:41:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = EventRecord::from_draft(draft, at);
        assert_eq!(record.timestamp, "09:41");
        assert_eq!(record.changes.get("funds"), Some(&500));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Rumor".parse::<InterventionKind>().unwrap(), InterventionKind::Rumor);
        assert_eq!("AUDIT".parse::<InterventionKind>().unwrap(), InterventionKind::Audit);
        assert_eq!("edict".parse::<InterventionKind>().unwrap(), InterventionKind::Edict);
        assert!("coup".parse::<InterventionKind>().is_err());
    }
}
