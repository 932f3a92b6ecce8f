// ABOUTME: HTTP server assembly binding all route groups into one axum application
// ABOUTME: Configures CORS and request tracing and runs until ctrl-c
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # HTTP Server
//!
//! Builds the application router from the route groups, layers CORS and
//! request tracing on top, and serves it on the configured port until the
//! process receives ctrl-c.

use std::sync::Arc;

use axum::Router;
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;
use crate::routes::{ChatRoutes, ExportRoutes, HealthRoutes, PromptRoutes};

/// Build the full application router
#[must_use]
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes())
        .merge(ChatRoutes::routes(Arc::clone(resources)))
        .merge(PromptRoutes::routes(Arc::clone(resources)))
        .merge(ExportRoutes::routes(Arc::clone(resources)))
        .layer(setup_cors(&resources.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Configure CORS from the comma-separated origin list, "*" allowing any
fn setup_cors(allowed_origins: &str) -> CorsLayer {
    let allow_origin = if allowed_origins.is_empty() || allowed_origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    HeaderValue::from_str(trimmed).ok()
                }
            })
            .collect();

        if origins.is_empty() {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(origins)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers([
            http::header::HeaderName::from_static("content-type"),
            http::header::HeaderName::from_static("accept"),
            http::header::HeaderName::from_static("origin"),
        ])
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
}

/// Serve the application until ctrl-c
pub async fn run(resources: Arc<ServerResources>) -> AppResult<()> {
    let port = resources.config.http_port;
    let app = build_router(&resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind port {port}: {e}")))?;

    info!("server listening on http://0.0.0.0:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
}
