//! Route definitions for the `/admin` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin` (admin only).
///
/// ```text
/// POST /confirmation-codes/purge  -> purge_confirmation_codes
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/confirmation-codes/purge",
        post(admin::purge_confirmation_codes),
    )
}
