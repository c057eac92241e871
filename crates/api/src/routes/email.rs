//! Route definitions for the `/email` resource.

use axum::routing::put;
use axum::Router;

use crate::handlers::email;
use crate::state::AppState;

/// Routes mounted at `/email`.
///
/// ```text
/// PUT /validate/{code}  -> validate_email
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/validate/{code}", put(email::validate_email))
}
