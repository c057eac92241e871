use axum::extract::State;
use axum::{routing::get, Json, Router};
use obmin_core::store::with_timeout;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: String,
    /// Crate version from Cargo.toml.
    pub version: String,
    /// Whether the backing store answered in time.
    pub store_healthy: bool,
}

/// GET /health -- returns service and store health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_healthy = with_timeout(state.config.store_timeout(), state.users.ping())
        .await
        .is_ok();

    let status = if store_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
