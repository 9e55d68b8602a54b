//! Streaming / download endpoint.
//!
//! `GET /stream/{link}` decodes the link, resolves its media upstream,
//! negotiates the `Range` header and streams the window through the
//! chunk adapter. Every resolution failure is the same plain 404.

use axum::body::Body;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use lc_core::media::OCTET_STREAM;
use lc_core::{negotiate, WindowStatus};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;
use crate::resolver;
use crate::streaming::stream_window;

/// Query string of the stream route.
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    pub download: Option<String>,
}

impl StreamParams {
    /// `?download`, `?download=1`, `?download=true` force an attachment;
    /// an explicit false value does not.
    pub fn wants_download(&self) -> bool {
        match self.download.as_deref() {
            None => false,
            Some(value) => !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ),
        }
    }
}

/// GET /stream/{link}
pub async fn stream_media(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Path(link): Path<String>,
    Query(params): Query<StreamParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let resolved = resolver::resolve_link(ctx.upstream.repository.as_ref(), &link).await?;
    let media = resolved.descriptor;
    let handle = resolved.handle;

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let window = negotiate(range, media.size_bytes);

    tracing::debug!(
        request_id = %request_id,
        link = %link,
        range = range.unwrap_or("-"),
        start = window.start,
        len = window.len,
        total = window.total,
        status = ?window.status,
        "Serving stream"
    );

    if window.status == WindowStatus::Unsatisfiable {
        let content_range = window.content_range().unwrap_or_default();
        return Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [
                (header::CONTENT_RANGE, content_range),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            Body::empty(),
        )
            .into_response());
    }

    let status = StatusCode::from_u16(window.status_code()).unwrap_or(StatusCode::OK);
    let content_type = HeaderValue::from_str(&media.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
    let disposition = HeaderValue::from_str(&media.content_disposition(params.wants_download()))
        .map_err(|e| lc_core::Error::Internal(format!("Content-Disposition: {e}")))?;

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, window.len)
        .header(header::CONTENT_DISPOSITION, disposition);
    if let Some(content_range) = window.content_range() {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    let body = Body::from_stream(stream_window(ctx.upstream.chunks.clone(), handle, &window));
    builder
        .body(body)
        .map_err(|e| AppError::from(lc_core::Error::Internal(format!("response build failed: {e}"))))
}
