//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory upstream, default
//! config and a full [`AppContext`]. The [`TestHarness::with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use lc_core::config::Config;
use lc_core::{AttachmentKind, ContainerRef};
use lc_server::context::AppContext;
use lc_server::router::build_router;
use lc_upstream::{MemoryRepository, ObjectHandle, UpstreamHandle};

/// Chunk size of the harness upstream; small so ranges cross boundaries.
pub const CHUNK_SIZE: usize = 64;

/// Container behind `https://t.me/c/123456789/...` links.
pub const PRIVATE_CONTAINER: i64 = -100123456789;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// [`MemoryRepository`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub repo: Arc<MemoryRepository>,
}

impl TestHarness {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepository::new(CHUNK_SIZE));
        let ctx = AppContext::new(Config::default(), UpstreamHandle::new(repo.clone()));
        Self { ctx, repo }
    }

    /// Harness over an arbitrary upstream.
    pub fn with_upstream(upstream: UpstreamHandle) -> Self {
        let mut harness = Self::new();
        harness.ctx = AppContext::new(Config::default(), upstream);
        harness
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let addr = harness.serve().await;
        (harness, addr)
    }

    /// Serve this harness's context on a random port.
    pub async fn serve(&self) -> SocketAddr {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    /// Store a document attachment in the private test container.
    pub fn insert_document(
        &self,
        object_id: u64,
        file_name: Option<&str>,
        data: Vec<u8>,
    ) -> ObjectHandle {
        self.repo.insert_media(
            ContainerRef::Id(PRIVATE_CONTAINER),
            object_id,
            AttachmentKind::Document,
            file_name,
            None,
            data,
        )
    }

    /// Send one request through the router without a socket.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        build_router(self.ctx.clone())
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Percent-encoded stream path for a private-container object.
pub fn private_stream_path(object_id: u64) -> String {
    format!("/stream/https%3A%2F%2Ft.me%2Fc%2F123456789%2F{object_id}")
}

pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_to_string(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).unwrap()
}
