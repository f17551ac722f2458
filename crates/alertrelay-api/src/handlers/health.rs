//! Health endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: HealthStatus,
    /// Receivers in the active configuration
    pub receivers: usize,
    /// Service version information
    pub version: String,
}

/// Overall health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving with at least one receiver
    Healthy,
    /// Serving but every request will be rejected
    Degraded,
}

/// `GET /health`
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let receivers = state.registry.receiver_count();
    let status = if receivers == 0 { HealthStatus::Degraded } else { HealthStatus::Healthy };

    debug!(receivers, "Health check completed");

    Json(HealthResponse { status, receivers, version: env!("CARGO_PKG_VERSION").to_string() })
}
