//! Axum router construction for the trigger API.
//!
//! Assembles all routes into a single [`Router`] with CORS enabled for
//! cross-origin dashboards, request tracing, and a `no-store` cache
//! header so pollers always see the latest documents.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use boardroom_core::propose::EventProposer;
use boardroom_core::replicate::ReplicationSink;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the trigger server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/state` -- current company state document
/// - `GET /api/history` -- the bounded event history
/// - `POST /api/intervene/{kind}` -- inject an ad-hoc event
/// - `POST /api/reset` -- re-found the company
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router<P, R>(state: Arc<AppState<P, R>>) -> Router
where
    P: EventProposer + 'static,
    R: ReplicationSink + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let no_cache = SetResponseHeaderLayer::if_not_present(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // REST API
        .route("/api/state", get(handlers::get_state))
        .route("/api/history", get(handlers::get_history))
        .route("/api/intervene/{kind}", post(handlers::intervene))
        .route("/api/reset", post(handlers::reset))
        .layer(no_cache)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
