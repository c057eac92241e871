//! Handlers for the `/email` resource.

use axum::extract::{Path, State};
use axum::Json;
use obmin_core::error::AuthError;
use obmin_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::state::AppState;

/// Response for a successful email validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmailValidatedResponse {
    pub user_id: DbId,
    pub email_validated: bool,
}

/// PUT /api/v1/email/validate/{code}
///
/// Redeem a confirmation code. A code that is not a valid identifier is
/// treated the same as an unknown one.
pub async fn validate_email(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<EmailValidatedResponse>> {
    let id = Uuid::parse_str(&code).map_err(|_| AuthError::ConfirmationCodeNotFound)?;
    let user_id = state.confirmations.validate_and_consume(id).await?;

    Ok(Json(EmailValidatedResponse {
        user_id,
        email_validated: true,
    }))
}
