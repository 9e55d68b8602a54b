//! Axum router construction.
//!
//! Builds the application router with all routes and middleware layers.

use axum::http::{header, Method};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    // Players on other origins need to send Range and read the range headers.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([header::RANGE])
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
            header::CONTENT_DISPOSITION,
        ]);

    Router::new()
        .route("/", get(routes::home::index))
        .route("/health", get(routes::home::health))
        // The link itself contains slashes once decoded, so capture the rest
        // of the path.
        .route("/watch/{*link}", get(routes::watch::watch_page))
        .route("/stream/{*link}", get(routes::stream::stream_media))
        .fallback(routes::home::not_found)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
