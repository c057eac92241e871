//! Handlers for the `/user` resource.

use axum::extract::State;
use axum::Json;
use obmin_core::error::CoreError;
use obmin_core::store::with_timeout;
use serde::{Deserialize, Serialize};

use super::auth::UserInfo;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// The caller's profile together with the roles granted by their token.
#[derive(Debug, Serialize, Deserialize)]
pub struct MyInfoResponse {
    #[serde(flatten)]
    pub user: UserInfo,
    pub roles: Vec<String>,
}

/// GET /api/v1/user/my-info
pub async fn my_info(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<MyInfoResponse>> {
    let user = with_timeout(
        state.config.store_timeout(),
        state.users.find_by_login(&principal.subject),
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "user",
            id: principal.subject.clone(),
        })
    })?;

    Ok(Json(MyInfoResponse {
        user: UserInfo::from(&user),
        roles: principal.roles,
    }))
}
