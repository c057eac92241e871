pub mod admin;
pub mod auth;
pub mod email;
pub mod health;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/oauth2/login                               OAuth2 bridge (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
///
/// /email/validate/{code}                           redeem confirmation code (PUT)
///
/// /user/my-info                                    current user (requires auth)
///
/// /admin/confirmation-codes/purge                  run purge now (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/email", email::router())
        .nest("/user", user::router())
        .nest("/admin", admin::router())
}
