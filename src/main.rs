//! browserd - browser automation over HTTP
//!
//! A small server that launches browser sessions, drives them through a
//! fixed command vocabulary, and sweeps every session it owns on shutdown.

mod api;
mod driver;
mod session;
mod tools;

use api::{create_router, AppState};
use driver::CdpDriver;
use session::SessionRegistry;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "browserd=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = match std::env::var("BROWSERD_PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid BROWSERD_PORT {raw:?}, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    };

    let screenshot_dir = std::env::var("BROWSERD_SCREENSHOT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir());
    std::fs::create_dir_all(&screenshot_dir)?;

    // One driver, one registry of live sessions, shared with every handler
    let sessions = Arc::new(SessionRegistry::new(Arc::new(CdpDriver::new())));
    let state = AppState::new(sessions.clone(), screenshot_dir.clone());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(screenshot_dir = %screenshot_dir.display(), "browserd listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The HTTP surface is down; close every browser before the process goes.
    sessions.drain_all().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves once the process has been asked to stop.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM - shutting down");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT - shutting down");
        }
    }
}
