//! Route definitions for the `/auth` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register      -> register
/// POST /login         -> login
/// POST /oauth2/login  -> oauth2_login
/// POST /refresh       -> refresh
/// POST /logout        -> logout (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/oauth2/login", post(auth::oauth2_login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
}
