//! Health check endpoint for load balancers and monitoring.

use axum::{Json, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;

use crate::catalog::format_timestamp;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub success: bool,
    /// Always "healthy" while the process serves requests.
    pub status: &'static str,
    pub timestamp: String,
}

/// Liveness check.
///
/// The service has no hard dependencies: upstream outages only leave the
/// catalog empty, so a responding process is a healthy one.
#[tracing::instrument(name = "health.check")]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthStatus {
        success: true,
        status: "healthy",
        timestamp: format_timestamp(Utc::now()),
    })
}
