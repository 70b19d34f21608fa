//! LLM response parsing into typed event payloads.
//!
//! The LLM returns raw text (ideally JSON). This module extracts and
//! validates the response into the typed drafts, commentary maps, and
//! reaction lists the engine consumes. Each parser attempts multiple
//! recovery strategies before giving up, because real models wrap JSON
//! in prose, markdown fences, and trailing commas.

use std::collections::BTreeMap;

use boardroom_types::{Delta, EventDraft};

use crate::error::PipelineError;

/// Intermediate struct for deserializing the LLM's raw event JSON.
///
/// `changes` values arrive as whatever the model felt like emitting --
/// numbers, quoted numbers, numbers with thousands separators -- so they
/// are captured loosely and coerced afterwards.
#[derive(Debug, serde::Deserialize)]
struct RawEventPayload {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    proposer: String,
    #[serde(default)]
    changes: BTreeMap<String, serde_json::Value>,
}

/// One raw feed reaction as the model emits it.
#[derive(Debug, serde::Deserialize)]
struct RawReaction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    handle: String,
    content: String,
}

/// A parsed feed reaction, not yet stamped or roster-matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReaction {
    /// Display name the model attributed the post to.
    pub name: String,
    /// Account handle the model attributed the post to.
    pub handle: String,
    /// The post text.
    pub content: String,
}

/// Parse an LLM response into an [`EventDraft`].
///
/// The `source_url` is attached by the caller (it comes from the news
/// seeding decision, not the model).
///
/// # Errors
///
/// Returns [`PipelineError::Parse`] if no recovery strategy yields a
/// payload with a non-empty title.
pub fn parse_event_payload(raw: &str) -> Result<EventDraft, PipelineError> {
    let payload: RawEventPayload = parse_with_recovery(raw)?;
    if payload.title.trim().is_empty() {
        return Err(PipelineError::Parse("event payload has no title".to_owned()));
    }

    let mut changes = Delta::new();
    for (resource, value) in &payload.changes {
        let amount = coerce_int(value).ok_or_else(|| {
            PipelineError::Parse(format!(
                "unusable change value for {resource}: {value}"
            ))
        })?;
        changes.insert(resource.clone(), amount);
    }

    Ok(EventDraft {
        title: payload.title,
        description: payload.description,
        proposer: payload.proposer,
        source_url: None,
        changes,
    })
}

/// Parse an LLM response into a per-executive commentary map.
///
/// Accepts either a flat `{ "Name": "comment" }` object or a
/// `{ "comments": { ... } }` wrapper.
pub fn parse_commentary(raw: &str) -> Result<BTreeMap<String, String>, PipelineError> {
    let value: serde_json::Value = parse_with_recovery(raw)?;
    let object = value
        .get("comments")
        .and_then(serde_json::Value::as_object)
        .or_else(|| value.as_object())
        .ok_or_else(|| PipelineError::Parse("commentary is not an object".to_owned()))?;

    Ok(object
        .iter()
        .filter_map(|(name, text)| {
            text.as_str()
                .map(|t| (name.clone(), t.to_owned()))
        })
        .collect())
}

/// Parse an LLM response into a list of feed reactions.
///
/// Accepts either a bare array or a `{ "reactions": [ ... ] }` wrapper.
pub fn parse_reactions(raw: &str) -> Result<Vec<ParsedReaction>, PipelineError> {
    let value: serde_json::Value = parse_with_recovery(raw)?;
    let items = value
        .get("reactions")
        .and_then(serde_json::Value::as_array)
        .or_else(|| value.as_array())
        .ok_or_else(|| PipelineError::Parse("reactions is not an array".to_owned()))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            serde_json::from_value::<RawReaction>(item.clone())
                .ok()
                .map(|raw| ParsedReaction {
                    name: raw.name,
                    handle: raw.handle,
                    content: raw.content,
                })
        })
        .filter(|r| !r.content.trim().is_empty())
        .collect())
}

/// Attempt to deserialize through multiple recovery strategies:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from markdown code blocks
/// 3. Strip trailing commas and retry
/// 4. Code block extraction plus comma stripping
/// 5. Slice from the first `{` to the last `}` and retry
fn parse_with_recovery<T: serde::de::DeserializeOwned>(
    raw: &str,
) -> Result<T, PipelineError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(json_str)
    {
        return Ok(parsed);
    }

    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(json_str);
        if let Ok(parsed) = serde_json::from_str::<T>(&cleaned_inner) {
            return Ok(parsed);
        }
    }

    if let Some(braced) = extract_braced_region(trimmed) {
        let cleaned_braced = strip_trailing_commas(braced);
        if let Ok(parsed) = serde_json::from_str::<T>(&cleaned_braced) {
            return Ok(parsed);
        }
    }

    Err(PipelineError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Coerce a loosely-typed JSON value into a signed integer.
///
/// Handles plain numbers, floats (truncated toward zero), quoted numbers,
/// and quoted numbers with thousands separators or a leading `+`.
pub fn coerce_int(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(f) = value.as_f64() {
        if f.is_finite() && f >= -9_007_199_254_740_992.0 && f <= 9_007_199_254_740_992.0 {
            #[allow(clippy::cast_possible_truncation)]
            return Some(f.trunc() as i64);
        }
        return None;
    }
    let text = value.as_str()?;
    let cleaned: String = text
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();
    cleaned.parse::<i64>().ok()
}

/// Extract JSON from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```json").map(|i| {
        let after_tag = i.checked_add(7).unwrap_or(i);
        text.get(after_tag..)
            .and_then(|s| s.find('\n'))
            .and_then(|nl| after_tag.checked_add(nl))
            .and_then(|pos| pos.checked_add(1))
            .unwrap_or(after_tag)
    }).or_else(|| {
        text.find("```").map(|i| {
            let after_tag = i.checked_add(3).unwrap_or(i);
            text.get(after_tag..)
                .and_then(|s| s.find('\n'))
                .and_then(|nl| after_tag.checked_add(nl))
                .and_then(|pos| pos.checked_add(1))
                .unwrap_or(after_tag)
        })
    });

    let start = start?;
    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Slice the text from the first `{` to the last `}` inclusive.
fn extract_braced_region(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    let end = end.checked_add(1)?;
    if end <= start {
        return None;
    }
    text.get(start..end)
}

/// Strip trailing commas before closing braces and brackets (common LLM error).
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut i = 0;
    while i < len {
        let c = chars.get(i).copied().unwrap_or(' ');
        if c == ',' {
            // Look ahead past whitespace for } or ]
            let mut j = i.checked_add(1).unwrap_or(i);
            while j < len && chars.get(j).copied().unwrap_or(' ').is_whitespace() {
                j = j.checked_add(1).unwrap_or(j);
            }
            let next = chars.get(j).copied().unwrap_or(' ');
            if next == '}' || next == ']' {
                i = i.checked_add(1).unwrap_or(i);
                continue;
            }
        }
        result.push(c);
        i = i.checked_add(1).unwrap_or(len);
    }

    result
}
