use axum::routing::get;
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/user` (auth required).
pub fn router() -> Router<AppState> {
    Router::new().route("/my-info", get(user::my_info))
}
