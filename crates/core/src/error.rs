use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure taxonomy of the authentication subsystem.
///
/// Credential and token variants carry detail for internal logging only; the
/// HTTP layer collapses them into a single "unauthenticated" response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token is malformed: {0}")]
    TokenMalformed(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Confirmation code not found")]
    ConfirmationCodeNotFound,

    #[error("Confirmation code has expired")]
    ConfirmationCodeExpired,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this failure must be reported to the caller as a generic
    /// "unauthenticated" outcome.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::TokenMalformed(_)
                | AuthError::TokenExpired
                | AuthError::TokenRevoked
        )
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
            // Conflicts never arise on the authentication paths that convert
            // through here; treat them as an infrastructure fault.
            StoreError::Conflict(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CoreError::Internal(msg),
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
        }
    }
}
