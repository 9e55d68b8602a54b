//! Informational and liveness routes.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

/// GET /
pub async fn index() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "linkcast is running. Open /watch/<link> to play a shared object \
         or /stream/<link>?download to fetch it.",
    )
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "404: Not found",
    )
}
