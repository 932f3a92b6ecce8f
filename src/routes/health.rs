// ABOUTME: Health check route handler for service monitoring
// ABOUTME: Reports liveness for load balancers and uptime probes
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health check route for service monitoring.

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    #[must_use]
    pub fn routes() -> axum::Router {
        use axum::{routing::get, Json, Router};

        async fn health_handler() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "status": "ok",
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }

        Router::new().route("/health", get(health_handler))
    }
}
