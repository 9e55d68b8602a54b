//! lc-server: HTTP front end that turns deep links into playable streams.
//!
//! This crate ties the link/range/media logic of `lc-core` to an upstream
//! from `lc-upstream`. It provides:
//!
//! - Axum routes for the player page and the range-aware stream endpoint
//! - Metadata resolution and the range-accurate streaming adapter
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod resolver;
pub mod router;
pub mod routes;
pub mod streaming;

use std::net::SocketAddr;

use lc_core::config::Config;
use lc_upstream::UpstreamHandle;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the linkcast server.
///
/// Builds the upstream session named in the configuration, binds the
/// listener and serves until a shutdown signal arrives.
pub async fn start(config: Config) -> lc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let upstream = UpstreamHandle::from_config(&config.upstream);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| lc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| lc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr}");
    tracing::info!("Public base URL: {}", config.server.base_url);

    let ctx = AppContext::new(config, upstream);
    run(listener, ctx, CancellationToken::new()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve on an already-bound listener until `cancel` fires or the process
/// receives SIGINT/SIGTERM. In-flight streams are dropped with the server.
pub async fn run(
    listener: TcpListener,
    ctx: AppContext,
    cancel: CancellationToken,
) -> lc_core::Result<()> {
    let app = router::build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| lc_core::Error::Internal(format!("Server error: {e}")))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
