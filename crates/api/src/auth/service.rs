//! Login, refresh rotation and logout.
//!
//! Every store call is bounded by the configured store timeout; an elapsed
//! call surfaces as [`AuthError::StoreUnavailable`].

use std::sync::Arc;
use std::time::Duration;

use obmin_core::error::AuthError;
use obmin_core::roles::ROLE_USER;
use obmin_core::store::{
    with_timeout, NewUser, RevocationStore, StoreError, UserRecord, UserStore,
};
use obmin_core::users::{username_from_identity, with_suffix};
use uuid::Uuid;

use super::authenticator::Principal;
use super::jwt::{IssuedToken, TokenCodec, TokenError, TokenKind};
use super::password::password_matches;

/// Usernames tried for one OAuth2 first login before giving up.
const OAUTH2_USERNAME_ATTEMPTS: usize = 5;

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

/// What a caller presents to log in.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Username or email plus plaintext password.
    Password { login: String, password: String },
    /// An identity already verified by an OAuth2 provider.
    OAuth2 { email: String, name: Option<String> },
}

/// An access token and a refresh token bound to the same subject.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserRecord,
    pub tokens: TokenPair,
}

pub struct AuthService {
    codec: Arc<TokenCodec>,
    users: Arc<dyn UserStore>,
    revocations: Arc<dyn RevocationStore>,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        codec: Arc<TokenCodec>,
        users: Arc<dyn UserStore>,
        revocations: Arc<dyn RevocationStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            users,
            revocations,
            store_timeout,
        }
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Verify `credentials` and issue a fresh token pair.
    pub async fn login(&self, credentials: Credentials) -> Result<AuthSession, AuthError> {
        let user = match credentials {
            Credentials::Password { login, password } => {
                self.verify_password_login(&login, &password).await?
            }
            Credentials::OAuth2 { email, name } => self.resolve_oauth2_user(&email, name).await?,
        };

        if !user.is_active {
            tracing::info!(user_id = user.id, "Login refused for disabled account");
            return Err(AuthError::AccountDisabled);
        }

        let tokens = self.issue_pair(&user)?;
        tracing::info!(user_id = user.id, jti = %tokens.access.claims.jti, "User logged in");
        Ok(AuthSession { user, tokens })
    }

    async fn verify_password_login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let found = with_timeout(self.store_timeout, self.users.find_by_login(login)).await?;

        let Some(user) = found else {
            // Burn the same hashing work as a wrong password.
            password_matches(password, None);
            tracing::debug!(login, "Login failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !password_matches(password, user.password_hash.as_deref()) {
            tracing::debug!(user_id = user.id, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Find the user owning a verified OAuth2 email, creating one on first login.
    ///
    /// The provider's name only seeds the username. When it is taken a random
    /// suffix is added and the create retried; a conflict on the email itself
    /// means a concurrent first login won, and its account is returned.
    async fn resolve_oauth2_user(
        &self,
        email: &str,
        name: Option<String>,
    ) -> Result<UserRecord, AuthError> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok(user);
        }

        let base = username_from_identity(name.as_deref(), email);
        let mut username = base.clone();
        for attempt in 1..=OAUTH2_USERNAME_ATTEMPTS {
            let input = NewUser {
                username: username.clone(),
                email: email.to_string(),
                password_hash: None,
                role: ROLE_USER.to_string(),
                email_validated: true,
            };

            match with_timeout(self.store_timeout, self.users.create(&input)).await {
                Ok(user) => {
                    tracing::info!(user_id = user.id, "Created user from OAuth2 identity");
                    return Ok(user);
                }
                Err(StoreError::Conflict(_)) => {
                    if let Some(user) = self.find_by_email(email).await? {
                        return Ok(user);
                    }
                    tracing::debug!(%username, attempt, "OAuth2 username taken");
                    username = with_suffix(&base, &random_suffix());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::Internal(format!(
            "no free username for OAuth2 identity after {OAUTH2_USERNAME_ATTEMPTS} attempts"
        )))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(with_timeout(self.store_timeout, self.users.find_by_email(email)).await?)
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Redeem a refresh token for a new pair.
    ///
    /// The presented token is revoked before the new pair is issued, so an
    /// interrupted rotation leaves it unusable and the client must log in
    /// again.
    pub async fn refresh(&self, raw: &str) -> Result<AuthSession, AuthError> {
        // 1. Signature, expiry and kind.
        let claims = self.codec.decode_kind(raw, TokenKind::Refresh).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            AuthError::from(e)
        })?;

        // 2. Already rotated or logged out.
        if with_timeout(self.store_timeout, self.revocations.is_revoked(&claims.jti)).await? {
            tracing::warn!(jti = %claims.jti, sub = %claims.sub, "Revoked refresh token presented");
            return Err(AuthError::TokenRevoked);
        }

        // 3. Revoke. Only the caller that records the entry may proceed.
        let inserted = with_timeout(
            self.store_timeout,
            self.revocations.revoke(&claims.jti, claims.expires_at()),
        )
        .await?;
        if !inserted {
            tracing::warn!(jti = %claims.jti, sub = %claims.sub, "Concurrent refresh token replay");
            return Err(AuthError::TokenRevoked);
        }

        // 4. Re-read the user so role and status changes take effect.
        let user = with_timeout(self.store_timeout, self.users.find_by_login(&claims.sub))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        // 5. New pair.
        let tokens = self.issue_pair(&user)?;
        tracing::info!(user_id = user.id, "Refresh token rotated");
        Ok(AuthSession { user, tokens })
    }

    // -----------------------------------------------------------------------
    // Logout
    // -----------------------------------------------------------------------

    /// Revoke the caller's access token and, when supplied, its refresh token.
    ///
    /// An already expired refresh token needs no entry and is skipped. A
    /// refresh token that is malformed or belongs to another subject fails the
    /// whole call before anything is revoked.
    pub async fn logout(
        &self,
        principal: &Principal,
        refresh_raw: Option<&str>,
    ) -> Result<(), AuthError> {
        let refresh_claims = match refresh_raw {
            None => None,
            Some(raw) => match self.codec.decode_kind(raw, TokenKind::Refresh) {
                Ok(claims) if claims.sub == principal.subject => Some(claims),
                Ok(_) => {
                    tracing::warn!(sub = %principal.subject, "Logout with foreign refresh token");
                    return Err(AuthError::TokenMalformed("subject mismatch".into()));
                }
                Err(TokenError::Expired) => None,
                Err(e) => return Err(e.into()),
            },
        };

        with_timeout(
            self.store_timeout,
            self.revocations
                .revoke(&principal.token_id, principal.expires_at),
        )
        .await?;

        if let Some(claims) = refresh_claims {
            with_timeout(
                self.store_timeout,
                self.revocations.revoke(&claims.jti, claims.expires_at()),
            )
            .await?;
        }

        tracing::info!(sub = %principal.subject, "User logged out");
        Ok(())
    }

    fn issue_pair(&self, user: &UserRecord) -> Result<TokenPair, AuthError> {
        let roles = vec![user.role.clone()];
        let access = self
            .codec
            .issue(&user.username, &roles, TokenKind::Access)?;
        let refresh = self.codec.issue(&user.username, &[], TokenKind::Refresh)?;
        Ok(TokenPair { access, refresh })
    }
}
