//! Handlers for the `/auth` resource (register, login, refresh, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use obmin_core::error::CoreError;
use obmin_core::roles::ROLE_USER;
use obmin_core::store::{NewUser, UserRecord};
use obmin_core::types::DbId;
use obmin_core::users::validate_username;
use obmin_mail::{EmailType, MailPayload};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_input;
use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::auth::service::{AuthSession, Credentials};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "username")]
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub username_or_email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for `POST /auth/oauth2/login`.
///
/// The identity has already been verified by the OAuth2 provider.
#[derive(Debug, Deserialize, Validate)]
pub struct OAuth2LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub name: Option<String>,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Request body for `POST /auth/logout`. The body itself is optional.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Username must be 2-50 characters"))]
    pub username: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
    pub user: UserInfo,
}

/// Public user info embedded in responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
    pub email_validated: bool,
}

impl From<&UserRecord> for UserInfo {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            email_validated: user.email_validated,
        }
    }
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        let access = &session.tokens.access.claims;
        let refresh = &session.tokens.refresh.claims;
        Self {
            expires_in: access.exp - access.iat,
            refresh_expires_in: refresh.exp - refresh.iat,
            access_token: session.tokens.access.token,
            refresh_token: session.tokens.refresh.token,
            token_type: "Bearer".to_string(),
            user: UserInfo::from(&session.user),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username (or email) + password.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    validate_input(&input)?;

    let session = state
        .auth
        .login(Credentials::Password {
            login: input.username_or_email,
            password: input.password,
        })
        .await?;

    Ok(Json(session.into()))
}

/// POST /api/v1/auth/oauth2/login
///
/// Exchange a provider-verified identity for the platform's token pair.
pub async fn oauth2_login(
    State(state): State<AppState>,
    Json(input): Json<OAuth2LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    validate_input(&input)?;

    let session = state
        .auth
        .login(Credentials::OAuth2 {
            email: input.email,
            name: input.name,
        })
        .await?;

    Ok(Json(session.into()))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new pair. The presented token is spent.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    validate_input(&input)?;
    let session = state.auth.refresh(&input.refresh_token).await?;
    Ok(Json(session.into()))
}

/// POST /api/v1/auth/logout
///
/// Revoke the bearer access token and the supplied refresh token.
/// Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    input: Option<Json<LogoutRequest>>,
) -> AppResult<StatusCode> {
    let input = input.map(|Json(body)| body).unwrap_or_default();
    state
        .auth
        .logout(&principal, input.refresh_token.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/register
///
/// Create a password account and email a confirmation link. The mail is sent
/// from a detached task; a delivery failure is logged and does not fail the
/// registration.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    // 1. Validate the payload.
    validate_input(&input)?;
    validate_username(&input.username)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    // 2. Hash the password.
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    // 3. Create the user and its confirmation code together. Duplicates
    //    surface as 409.
    let new_user = NewUser {
        username: input.username,
        email: input.email,
        password_hash: Some(password_hash),
        role: ROLE_USER.to_string(),
        email_validated: false,
    };
    let (user, code) = state.confirmations.register(&new_user).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    // 4. Dispatch the confirmation email without waiting on it.
    let mailer = state.mailer.clone();
    let to = user.email.clone();
    let payload = MailPayload {
        username: user.username.clone(),
        confirmation_url: state.config.confirmation_url(&code.id),
    };
    let user_id = user.id;
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&to, EmailType::Registration, &payload).await {
            tracing::warn!(user_id, error = %e, "Failed to send registration email");
        }
    });

    Ok((StatusCode::CREATED, Json(UserInfo::from(&user))))
}
