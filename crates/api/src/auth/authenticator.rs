//! Per-request bearer token gate.
//!
//! `NoToken` -> present -> decode -> kind check -> revocation lookup ->
//! [`Principal`]. The revocation store is only consulted once the token has
//! passed signature and expiry checks, and it is never written to here.

use std::sync::Arc;
use std::time::Duration;

use obmin_core::error::AuthError;
use obmin_core::store::{with_timeout, RevocationStore};
use obmin_core::types::Timestamp;

use super::jwt::{TokenCodec, TokenError, TokenKind};

/// Identity reconstructed from a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Username carried in the token subject.
    pub subject: String,
    pub roles: Vec<String>,
    /// The access token's `jti`.
    pub token_id: String,
    pub expires_at: Timestamp,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Why a request could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoToken,
    /// An `Authorization` header that is not `Bearer <token>`.
    BadScheme,
    DecodeFailed(TokenError),
    /// A refresh token presented as a bearer credential.
    WrongKind,
    Revoked,
    StoreUnavailable(String),
}

impl Rejection {
    pub fn into_auth_error(self) -> AuthError {
        match self {
            Rejection::NoToken => AuthError::TokenMalformed("no bearer token".into()),
            Rejection::BadScheme => {
                AuthError::TokenMalformed("expected Authorization: Bearer <token>".into())
            }
            Rejection::DecodeFailed(e) => e.into(),
            Rejection::WrongKind => AuthError::TokenMalformed("not an access token".into()),
            Rejection::Revoked => AuthError::TokenRevoked,
            Rejection::StoreUnavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

pub struct RequestAuthenticator {
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationStore>,
    store_timeout: Duration,
}

impl RequestAuthenticator {
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<dyn RevocationStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            revocations,
            store_timeout,
        }
    }

    /// Authenticate the raw value of an `Authorization` header.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, Rejection> {
        let header = header.ok_or(Rejection::NoToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Rejection::BadScheme)?;
        self.authenticate_token(token).await
    }

    /// Authenticate a bare access token.
    pub async fn authenticate_token(&self, raw: &str) -> Result<Principal, Rejection> {
        let claims = self
            .codec
            .decode_kind(raw, TokenKind::Access)
            .map_err(|e| match e {
                TokenError::WrongKind { .. } => Rejection::WrongKind,
                other => Rejection::DecodeFailed(other),
            })?;

        let revoked = with_timeout(self.store_timeout, self.revocations.is_revoked(&claims.jti))
            .await
            .map_err(|e| Rejection::StoreUnavailable(e.to_string()))?;
        if revoked {
            tracing::debug!(jti = %claims.jti, sub = %claims.sub, "Rejected revoked access token");
            return Err(Rejection::Revoked);
        }

        let expires_at = claims.expires_at();
        Ok(Principal {
            subject: claims.sub,
            roles: claims.roles,
            token_id: claims.jti,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtConfig;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use obmin_core::store::memory::InMemoryStore;

    fn setup() -> (RequestAuthenticator, Arc<TokenCodec>, Arc<InMemoryStore>) {
        let codec = Arc::new(TokenCodec::new(&JwtConfig {
            secret: "authenticator-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }));
        let store = Arc::new(InMemoryStore::new());
        let authenticator = RequestAuthenticator::new(
            Arc::clone(&codec),
            store.clone(),
            Duration::from_secs(1),
        );
        (authenticator, codec, store)
    }

    #[tokio::test]
    async fn valid_bearer_yields_principal() {
        let (auth, codec, _) = setup();
        let issued = codec
            .issue("alice", &["ROLE_USER".to_string()], TokenKind::Access)
            .unwrap();

        let principal = auth
            .authenticate(Some(&format!("Bearer {}", issued.token)))
            .await
            .unwrap();
        assert_eq!(principal.subject, "alice");
        assert_eq!(principal.token_id, issued.claims.jti);
        assert!(principal.has_role("ROLE_USER"));
        assert!(!principal.has_role("ROLE_ADMIN"));
    }

    #[tokio::test]
    async fn missing_or_badly_formed_header() {
        let (auth, _, _) = setup();
        assert_eq!(auth.authenticate(None).await, Err(Rejection::NoToken));
        assert_eq!(
            auth.authenticate(Some("Basic abc")).await,
            Err(Rejection::BadScheme)
        );
        assert_eq!(
            auth.authenticate(Some("Bearer ")).await,
            Err(Rejection::BadScheme)
        );
        assert_matches!(
            auth.authenticate(Some("Bearer garbage")).await,
            Err(Rejection::DecodeFailed(TokenError::Malformed(_)))
        );
    }

    #[tokio::test]
    async fn refresh_token_is_not_a_bearer_credential() {
        let (auth, codec, _) = setup();
        let refresh = codec.issue("alice", &[], TokenKind::Refresh).unwrap();
        assert_eq!(
            auth.authenticate_token(&refresh.token).await,
            Err(Rejection::WrongKind)
        );
    }

    #[tokio::test]
    async fn revoked_token_is_rejected_without_mutating_store() {
        let (auth, codec, store) = setup();
        let issued = codec.issue("alice", &[], TokenKind::Access).unwrap();
        store
            .revoke(&issued.claims.jti, issued.claims.expires_at())
            .await
            .unwrap();

        assert_eq!(
            auth.authenticate_token(&issued.token).await,
            Err(Rejection::Revoked)
        );
        assert_eq!(store.revoked_count().await, 1);
    }

    #[tokio::test]
    async fn expired_token_fails_before_store_is_consulted() {
        let (auth, codec, store) = setup();
        let issued = codec
            .issue_at(
                "alice",
                &[],
                TokenKind::Access,
                chrono::Duration::minutes(1),
                Utc::now() - chrono::Duration::hours(1),
            )
            .unwrap();
        // An offline store would otherwise surface as StoreUnavailable.
        store.set_available(false);

        assert_eq!(
            auth.authenticate_token(&issued.token).await,
            Err(Rejection::DecodeFailed(TokenError::Expired))
        );
    }

    #[tokio::test]
    async fn store_outage_is_not_unauthenticated() {
        let (auth, codec, store) = setup();
        let issued = codec.issue("alice", &[], TokenKind::Access).unwrap();
        store.set_available(false);

        let rejection = auth.authenticate_token(&issued.token).await.unwrap_err();
        assert_matches!(rejection, Rejection::StoreUnavailable(_));
        assert_matches!(rejection.into_auth_error(), AuthError::StoreUnavailable(_));
    }
}
