//! Signed token issuance and decoding.
//!
//! Access and refresh tokens are both HS256-signed JWTs carrying a [`Claims`]
//! payload; the `kind` claim tells them apart. Each token gets a fresh UUID v4
//! `jti`, which is the key used for revocation. Decoding is pure: it checks the
//! signature and expiry only and never consults the revocation store.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use obmin_core::error::AuthError;
use obmin_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distinguishes short-lived access tokens from single-use refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject -- the username.
    pub sub: String,
    pub kind: TokenKind,
    /// Granted roles. Empty on refresh tokens; roles are re-read on rotation.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4), the revocation key.
    pub jti: String,
}

impl Claims {
    /// The token's natural expiry as a timestamp.
    pub fn expires_at(&self) -> Timestamp {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Reasons a token fails to encode or decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Encoding(msg) => AuthError::Internal(msg),
            other => AuthError::TokenMalformed(other.to_string()),
        }
    }
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
/// Longest accepted access token lifetime (one week).
const MAX_ACCESS_EXPIRY_MINS: i64 = 7 * 24 * 60;
/// Longest accepted refresh token lifetime.
const MAX_REFRESH_EXPIRY_DAYS: i64 = 365;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        let config = Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        };
        config
            .validate()
            .unwrap_or_else(|msg| panic!("Invalid JWT configuration: {msg}"));
        config
    }

    /// Check that both lifetimes are positive and within bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_ACCESS_EXPIRY_MINS).contains(&self.access_token_expiry_mins) {
            return Err(format!(
                "JWT_ACCESS_EXPIRY_MINS must be between 1 and {MAX_ACCESS_EXPIRY_MINS}"
            ));
        }
        if !(1..=MAX_REFRESH_EXPIRY_DAYS).contains(&self.refresh_token_expiry_days) {
            return Err(format!(
                "JWT_REFRESH_EXPIRY_DAYS must be between 1 and {MAX_REFRESH_EXPIRY_DAYS}"
            ));
        }
        Ok(())
    }
}

/// Encodes and decodes tokens with a fixed symmetric key.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; a token is dead the second after `exp`.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: Duration::try_minutes(config.access_token_expiry_mins)
                .unwrap_or(Duration::MAX),
            refresh_ttl: Duration::try_days(config.refresh_token_expiry_days)
                .unwrap_or(Duration::MAX),
        }
    }

    /// Configured lifetime for tokens of `kind`.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a token of `kind` for `subject` with the configured lifetime.
    pub fn issue(
        &self,
        subject: &str,
        roles: &[String],
        kind: TokenKind,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, roles, kind, self.ttl(kind), Utc::now())
    }

    /// Issue a token valid from `now` for `ttl`.
    pub fn issue_at(
        &self,
        subject: &str,
        roles: &[String],
        kind: TokenKind,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let exp = iat
            .checked_add(ttl.num_seconds())
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".into()))?;
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            roles: roles.to_vec(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Sign arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify the signature and expiry of `raw` and return its claims.
    pub fn decode(&self, raw: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(raw, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }

    /// Decode `raw` and require it to be of `expected` kind.
    pub fn decode_kind(&self, raw: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.decode(raw)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(claims)
    }
}
