// src/api/mod.rs

//! Read-only stats HTTP API.
//!
//! Routes:
//! - `GET /`: liveness text
//! - `GET /brands/stats`: mention counts per brand
//! - `GET /brands/{brand}/stories`: stored stories mentioning a brand

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::Result;
use crate::pipeline::wait_for_shutdown;
use crate::storage::StoryRepository;

pub use handlers::ErrorResponse;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn StoryRepository>,
}

impl AppState {
    pub fn new(repository: Arc<dyn StoryRepository>) -> Self {
        Self { repository }
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/brands/stats", get(handlers::brand_stats))
        .route("/brands/{brand}/stories", get(handlers::brand_stories))
        .with_state(state)
}

/// Bind the listener on all interfaces.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .inspect_err(|e| log::error!("Failed to bind {addr}: {e}"))?;
    Ok(listener)
}

/// Serve the API until shutdown is requested.
///
/// In-flight requests are allowed to finish.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Stats API listening on {addr}");
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { wait_for_shutdown(&mut shutdown).await })
        .await?;

    log::info!("Stats API stopped");
    Ok(())
}
