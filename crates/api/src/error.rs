use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use obmin_core::error::{AuthError, CoreError};
use obmin_core::store::StoreError;
use serde_json::json;

/// Caller-visible message for every credential and token failure.
const UNAUTHENTICATED_MESSAGE: &str = "Authentication required";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`AuthError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `obmin_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An authentication subsystem failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Core(CoreError::Conflict(msg)),
            StoreError::Unavailable(msg) => AppError::Auth(AuthError::StoreUnavailable(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    tracing::debug!(reason = %msg, "Unauthenticated request");
                    (
                        StatusCode::UNAUTHORIZED,
                        "UNAUTHORIZED",
                        UNAUTHENTICATED_MESSAGE.to_string(),
                    )
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- AuthError variants ---
            AppError::Auth(auth) => classify_auth_error(auth),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an auth failure into an HTTP status, error code, and message.
///
/// Credential and token failures collapse into one 401 so the caller cannot
/// tell which check failed; the detail is logged only.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    match err {
        e if e.is_unauthenticated() => {
            tracing::debug!(reason = %e, "Authentication failed");
            (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                UNAUTHENTICATED_MESSAGE.to_string(),
            )
        }
        AuthError::AccountDisabled => (
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Account is disabled".to_string(),
        ),
        AuthError::ConfirmationCodeNotFound => (
            StatusCode::NOT_FOUND,
            "CONFIRMATION_CODE_NOT_FOUND",
            "Confirmation code not found".to_string(),
        ),
        AuthError::ConfirmationCodeExpired => (
            StatusCode::GONE,
            "CONFIRMATION_CODE_EXPIRED",
            "Confirmation code has expired".to_string(),
        ),
        AuthError::StoreUnavailable(msg) => {
            tracing::warn!(error = %msg, "Store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable, retry later".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Internal auth error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
