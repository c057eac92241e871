//! Admin-only maintenance endpoints.

use axum::extract::State;
use axum::Json;
use obmin_core::error::AuthError;
use serde::{Deserialize, Serialize};

use crate::background::confirmation_purge::PurgeRun;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResponse {
    /// `completed` or `skipped`.
    pub status: String,
    pub deleted: u64,
}

/// POST /api/v1/admin/confirmation-codes/purge
///
/// Run the confirmation code purge now. Reports `skipped` when the scheduled
/// run is already in progress.
pub async fn purge_confirmation_codes(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<PurgeResponse>> {
    tracing::info!(admin = %admin.0.subject, "Manual confirmation purge requested");

    let response = match state.purge_scheduler.run_once().await {
        PurgeRun::Completed { deleted } => PurgeResponse {
            status: "completed".to_string(),
            deleted,
        },
        PurgeRun::Skipped => PurgeResponse {
            status: "skipped".to_string(),
            deleted: 0,
        },
        PurgeRun::Failed(msg) => return Err(AuthError::StoreUnavailable(msg).into()),
    };

    Ok(Json(response))
}
