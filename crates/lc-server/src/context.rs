//! Application context shared by all request handlers (via Axum state).

use std::sync::Arc;

use lc_core::config::Config;
use lc_upstream::UpstreamHandle;

/// Shared request-handler state.
///
/// Cheaply cloneable: it only holds `Arc`s. Requests never mutate it; the
/// upstream handle is a long-lived session used concurrently by every
/// stream.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Upstream repository session.
    pub upstream: UpstreamHandle,
}

impl AppContext {
    pub fn new(config: Config, upstream: UpstreamHandle) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
        }
    }
}
