//! Error types for the trigger API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the trigger API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The intervention kind in the request path is not recognized.
    #[error("unknown intervention kind: {0}")]
    UnknownKind(String),

    /// The store failed while persisting a commit or reset.
    #[error("store error: {0}")]
    Store(#[from] boardroom_store::StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::UnknownKind(kind) => (
                StatusCode::BAD_REQUEST,
                format!("unknown intervention kind: {kind}"),
            ),
            Self::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
