//! PostgreSQL implementation of the `obmin_core::store` traits.

use async_trait::async_trait;
use obmin_core::confirmation::{ConfirmationCode, ConsumeOutcome};
use obmin_core::store::{
    ConfirmationCodeStore, NewUser, RevocationStore, StoreError, UserRecord, UserStore,
};
use obmin_core::types::{DbId, Timestamp};
use uuid::Uuid;

use crate::repositories::{EmailConfirmationCodeRepo, RevokedTokenRepo, UserRepo};
use crate::DbPool;

/// PostgreSQL error code for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Store adapter over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Classify a sqlx error for the store layer.
///
/// Unique violations become [`StoreError::Conflict`]; every other failure
/// (connection loss, pool timeout, protocol error) is an unavailable store.
fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            return StoreError::Conflict(format!(
                "Duplicate value violates unique constraint: {constraint}"
            ));
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Unavailable(err.to_string())
}

fn duplicate_user() -> StoreError {
    StoreError::Conflict("username or email already registered".into())
}

#[async_trait]
impl UserStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = UserRepo::find_by_login(&self.pool, login)
            .await
            .map_err(store_error)?;
        Ok(user.map(Into::into))
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserRecord>, StoreError> {
        let user = UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(user.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = UserRepo::find_by_email(&self.pool, email)
            .await
            .map_err(store_error)?;
        Ok(user.map(Into::into))
    }

    async fn create(&self, input: &NewUser) -> Result<UserRecord, StoreError> {
        let user = UserRepo::create(&self.pool, input)
            .await
            .map_err(store_error)?
            .ok_or_else(duplicate_user)?;
        Ok(user.into())
    }
}

#[async_trait]
impl RevocationStore for PgStore {
    async fn revoke(&self, jti: &str, expires_at: Timestamp) -> Result<bool, StoreError> {
        RevokedTokenRepo::insert_if_absent(&self.pool, jti, expires_at)
            .await
            .map_err(store_error)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        RevokedTokenRepo::exists(&self.pool, jti)
            .await
            .map_err(store_error)
    }

    async fn reap(&self, now: Timestamp) -> Result<u64, StoreError> {
        RevokedTokenRepo::delete_expired(&self.pool, now)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl ConfirmationCodeStore for PgStore {
    async fn insert(&self, code: &ConfirmationCode) -> Result<(), StoreError> {
        EmailConfirmationCodeRepo::create(&self.pool, code)
            .await
            .map_err(store_error)
    }

    async fn create_user_with_code(
        &self,
        input: &NewUser,
        ttl_hours: i64,
        now: Timestamp,
    ) -> Result<(UserRecord, ConfirmationCode), StoreError> {
        // Dropping `tx` before commit (error or caller timeout) rolls back.
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let user = UserRepo::create(&mut *tx, input)
            .await
            .map_err(store_error)?
            .ok_or_else(duplicate_user)?;
        let code = ConfirmationCode::generate(user.id, ttl_hours, now);
        EmailConfirmationCodeRepo::create(&mut *tx, &code)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok((user.into(), code))
    }

    async fn find(&self, id: Uuid) -> Result<Option<ConfirmationCode>, StoreError> {
        let row = EmailConfirmationCodeRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(row.map(Into::into))
    }

    async fn consume(&self, id: Uuid, now: Timestamp) -> Result<ConsumeOutcome, StoreError> {
        EmailConfirmationCodeRepo::consume(&self.pool, id, now)
            .await
            .map_err(store_error)
    }

    async fn purge_expired_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        EmailConfirmationCodeRepo::delete_expired_before(&self.pool, cutoff)
            .await
            .map_err(store_error)
    }
}
