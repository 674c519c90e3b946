/// Axum webserver implementation
///
/// Server lifecycle: bind, serve, graceful termination. Shutdown stops
/// accepting new connections, drains the hub registry so connection
/// tasks terminate, and lets in-flight work finish before the serve
/// future resolves.
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::{
    config,
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver
///
/// Blocks until the server has shut down.
pub async fn start_server(state: Arc<AppState>) -> Result<()> {
    let (host, port) = config::with_config(|cfg| (cfg.server.host.clone(), cfg.server.port));

    let app = build_app(state.clone());

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", host, port))?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| match_addr_error(&addr))?;

    logger::log(
        LogTag::Webserver,
        "READY",
        &format!("telemetry hub listening on ws://{}/ws", addr),
    );

    let hub = state.hub.clone();
    let shutdown_signal = async move {
        SHUTDOWN_NOTIFY.notified().await;
        logger::info(LogTag::Webserver, "shutdown signal received, stopping...");
        // Stop accepting and drain the registry; connection tasks exit
        // once their queues close, letting axum finish gracefully.
        hub.shutdown().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("server error")?;

    logger::info(LogTag::Webserver, "webserver stopped gracefully");

    Ok(())
}

/// Trigger webserver shutdown (safe from any thread, including signal
/// handlers)
pub fn shutdown() {
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the Axum application with all routes and middleware
fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state)
}

fn match_addr_error(addr: &SocketAddr) -> String {
    format!(
        "failed to bind to {} (is another scopehub instance running, or does the port need privileges?)",
        addr
    )
}
