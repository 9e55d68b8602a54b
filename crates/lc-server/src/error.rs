//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`lc_core::Error`] so that route handlers
//! can return `Result<T, AppError>` directly.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Body of every resolution failure. Deliberately identical for all causes.
pub const NOT_FOUND_BODY: &str = "404: Media not found";

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: lc_core::Error,
}

impl AppError {
    pub fn new(inner: lc_core::Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &lc_core::Error {
        &self.inner
    }
}

impl From<lc_core::Error> for AppError {
    fn from(e: lc_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let plain = [(header::CONTENT_TYPE, "text/plain; charset=utf-8")];

        if self.inner.is_resolution() {
            match &self.inner {
                lc_core::Error::UpstreamUnreachable(_) => {
                    tracing::warn!(error = %self.inner, "Upstream lookup failed");
                }
                _ => tracing::debug!(error = %self.inner, "Media resolution failed"),
            }
            return (StatusCode::NOT_FOUND, plain, NOT_FOUND_BODY).into_response();
        }

        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in handler"
            );
        }

        (status, plain, self.inner.to_string()).into_response()
    }
}
