//! Store abstractions consumed by the authentication subsystem.
//!
//! The API layer depends only on these traits; `obmin-db` provides the
//! PostgreSQL implementation and [`memory::InMemoryStore`] backs tests and
//! local development.
//!
//! - [`UserStore`] -- user lookup and creation.
//! - [`RevocationStore`] -- token ids invalidated before natural expiry.
//! - [`ConfirmationCodeStore`] -- email confirmation codes.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::confirmation::{ConfirmationCode, ConsumeOutcome};
use crate::types::{DbId, Timestamp};

/// Infrastructure failure of a store operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or did not answer in time.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Await a store operation, converting an elapsed `limit` into
/// [`StoreError::Unavailable`].
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Unavailable(format!(
            "store call exceeded {}ms",
            limit.as_millis()
        ))),
    }
}

/// A user as seen by the authentication subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: DbId,
    pub username: String,
    pub email: String,
    /// PHC-formatted Argon2id hash. `None` for users created through OAuth2.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub email_validated: bool,
    pub created_at: Timestamp,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub email_validated: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Cheap reachability check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Find the user named by `login`: by email when it contains `@`,
    /// otherwise by username.
    async fn find_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a user. Fails with [`StoreError::Conflict`] when the username or
    /// email already appears in either column of another user.
    async fn create(&self, input: &NewUser) -> Result<UserRecord, StoreError>;
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `jti` as revoked until `expires_at`.
    ///
    /// Idempotent. Returns `true` only for the call that inserted the entry,
    /// which lets refresh rotation detect a concurrent redemption.
    async fn revoke(&self, jti: &str, expires_at: Timestamp) -> Result<bool, StoreError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError>;

    /// Drop entries whose recorded expiry is `<= now`. Returns the count removed.
    async fn reap(&self, now: Timestamp) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ConfirmationCodeStore: Send + Sync {
    async fn insert(&self, code: &ConfirmationCode) -> Result<(), StoreError>;

    /// Create a user and its first code valid for `ttl_hours` from `now`.
    ///
    /// Both records are written or neither is, so a failed code write never
    /// leaves an account that can no longer be confirmed.
    async fn create_user_with_code(
        &self,
        input: &NewUser,
        ttl_hours: i64,
        now: Timestamp,
    ) -> Result<(UserRecord, ConfirmationCode), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<ConfirmationCode>, StoreError>;

    /// Atomically check and consume the code at `now`.
    ///
    /// On [`ConsumeOutcome::Consumed`] the code is marked consumed and its
    /// owner's email is marked validated in the same atomic step. Concurrent
    /// callers for the same code observe at most one `Consumed`.
    async fn consume(&self, id: Uuid, now: Timestamp) -> Result<ConsumeOutcome, StoreError>;

    /// Delete every code whose expiry is strictly before `cutoff`.
    async fn purge_expired_before(&self, cutoff: Timestamp) -> Result<u64, StoreError>;
}
