//! REST API endpoint handlers for the trigger server.
//!
//! Reads go straight to the store documents; writes go through the same
//! commit and reset protocols the scheduler uses, so a request can never
//! bypass the synchronization engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/state` | Current company state document |
//! | `GET` | `/api/history` | The bounded event history |
//! | `POST` | `/api/intervene/{kind}` | Inject an ad-hoc event |
//! | `POST` | `/api/reset` | Re-found the company |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use tracing::info;

use boardroom_core::intervene::InterventionOutcome;
use boardroom_core::propose::EventProposer;
use boardroom_core::replicate::ReplicationSink;
use boardroom_types::{CompanyState, EventRecord, InterventionKind};

use crate::error::ApiError;
use crate::state::AppState;

/// Serve a minimal HTML page showing the company at a glance.
pub async fn index<P: EventProposer, R: ReplicationSink>(
    State(state): State<Arc<AppState<P, R>>>,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    let company = &state.company_name;
    let rating = &snapshot.rating;
    let reputation = &snapshot.reputation;
    let resources = snapshot
        .resources
        .iter()
        .map(|(name, value)| format!("<li>{name}: {value}</li>"))
        .collect::<String>();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{company}</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 700px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .rating {{ color: #3fb950; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>{company}</h1>
    <p class="subtitle">{reputation} -- rating <span class="rating">{rating}</span></p>

    <h2>Resources</h2>
    <ul>{resources}</ul>

    <h2>API</h2>
    <ul>
        <li>GET <a href="/api/state">/api/state</a> -- current state document</li>
        <li>GET <a href="/api/history">/api/history</a> -- recent events</li>
        <li>POST /api/intervene/rumor | audit | edict -- inject an event</li>
        <li>POST /api/reset -- re-found the company</li>
    </ul>
</body>
</html>"#
    ))
}

/// `GET /api/state` -- the current company state document.
pub async fn get_state<P: EventProposer, R: ReplicationSink>(
    State(state): State<Arc<AppState<P, R>>>,
) -> Json<CompanyState> {
    Json(state.store.snapshot().await)
}

/// `GET /api/history` -- the bounded event history, most recent first.
pub async fn get_history<P: EventProposer, R: ReplicationSink>(
    State(state): State<Arc<AppState<P, R>>>,
) -> Json<Vec<EventRecord>> {
    let guard = state.store.lock().await;
    let history = guard.load_history();
    drop(guard);
    Json(history)
}

/// `POST /api/intervene/{kind}` -- inject an ad-hoc event.
///
/// Unknown kinds are a 400 before any generation starts. Generation may
/// take seconds; concurrent requests are safe and serialized only at the
/// commit protocol.
pub async fn intervene<P: EventProposer, R: ReplicationSink>(
    State(state): State<Arc<AppState<P, R>>>,
    Path(kind): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind: InterventionKind = kind
        .parse()
        .map_err(|e: boardroom_types::UnknownKind| ApiError::UnknownKind(e.0))?;

    let outcome = state.interventions.intervene(kind).await?;

    Ok(Json(match outcome {
        InterventionOutcome::Committed(record) => serde_json::json!({
            "outcome": "committed",
            "event": record,
        }),
        InterventionOutcome::Interrupted => serde_json::json!({
            "outcome": "interrupted",
        }),
    }))
}

/// `POST /api/reset` -- re-found the company.
pub async fn reset<P: EventProposer, R: ReplicationSink>(
    State(state): State<Arc<AppState<P, R>>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.reset.reset(&state.store).await?;
    info!("reset requested via API");
    Ok(Json(serde_json::json!({ "outcome": "reset" })))
}
