//! HTTP API
//!
//! Routes:
//! - `POST /search` structured search
//! - `GET /details/{resource_id}` single record
//! - `GET /demo` full record set
//! - `GET /health` liveness

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::core::config::ServerConfig;
use crate::search::engine::SearchEngine;

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
}

impl AppState {
    pub fn new(engine: SearchEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Create the router with the given server settings
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/search", post(handlers::search))
        .route("/details/{resource_id}", get(handlers::details))
        .route("/demo", get(handlers::demo))
        .route("/health", get(handlers::health))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .with_state(state)
}

/// Any origin when `origins` is empty, otherwise exactly the listed ones
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind and serve until ctrl-c
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(address = %addr, "Listening");

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
