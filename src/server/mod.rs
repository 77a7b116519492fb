//! HTTP surface of the podcast site.
//!
//! | Route | Methods | Handler |
//! |-------|---------|---------|
//! | `/api/episodes` | GET | cached feed as JSON |
//! | `/api/audio/*path` | GET, HEAD, OPTIONS | streaming audio proxy |
//! | `/health` | GET | liveness probe |

pub mod audio;
pub mod episodes;
mod error;
mod state;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use error::{error_response, ErrorBody};
pub use state::AppState;

use crate::config::Config;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/episodes", get(episodes::get_episodes))
        .route(
            "/api/audio/*path",
            get(audio::proxy_get)
                .head(audio::proxy_head)
                .options(audio::preflight),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Serves `state` on an already bound listener until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    tracing::info!(%addr, "Podcast server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Binds `config.bind_addr` and serves until Ctrl-C.
pub async fn run(config: &Config) -> Result<()> {
    let state = AppState::from_config(config).context("Failed to build HTTP clients")?;
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    serve(listener, state).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
