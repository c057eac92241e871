//! Bearer token authentication for Axum.
//!
//! [`authenticate`] runs once per request: it extracts the `Authorization`
//! header, runs the [`RequestAuthenticator`] and attaches the resulting
//! [`Principal`] (or the [`Rejection`]) to the request extensions. Handlers
//! that require a caller take an [`AuthUser`] parameter; routes that don't
//! are unaffected by a missing or bad token.
//!
//! [`RequestAuthenticator`]: crate::auth::authenticator::RequestAuthenticator

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::authenticator::{Principal, Rejection};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller extracted from a valid, unrevoked access token.
///
/// ```ignore
/// async fn my_handler(AuthUser(principal): AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(sub = %principal.subject, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(AuthUser(principal.clone()));
        }
        if let Some(rejection) = parts.extensions.get::<Rejection>() {
            return Err(AppError::Auth(rejection.clone().into_auth_error()));
        }

        // Router assembled without the middleware.
        authenticate_headers(state, &parts.headers)
            .await
            .map(AuthUser)
            .map_err(|r| AppError::Auth(r.into_auth_error()))
    }
}

/// Middleware attaching the request's authentication outcome.
///
/// Install with `axum::middleware::from_fn_with_state`.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate_headers(&state, request.headers()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
        }
        Err(Rejection::NoToken) => {}
        Err(rejection) => {
            tracing::debug!(?rejection, path = %request.uri().path(), "Bearer token rejected");
            request.extensions_mut().insert(rejection);
        }
    }
    next.run(request).await
}

async fn authenticate_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, Rejection> {
    match headers.get(AUTHORIZATION) {
        None => Err(Rejection::NoToken),
        Some(value) => {
            let value = value.to_str().map_err(|_| Rejection::BadScheme)?;
            state.authenticator.authenticate(Some(value)).await
        }
    }
}
