//! Repository for the `revoked_tokens` table.

use obmin_core::types::Timestamp;
use sqlx::PgPool;

/// Tracks token ids invalidated before their natural expiry.
pub struct RevokedTokenRepo;

impl RevokedTokenRepo {
    /// Insert a revocation entry unless one already exists.
    ///
    /// Returns `true` if this call inserted the row.
    pub async fn insert_if_absent(
        pool: &PgPool,
        jti: &str,
        expires_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether a revocation entry exists for `jti`.
    pub async fn exists(pool: &PgPool, jti: &str) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)")
                .bind(jti)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Delete entries whose token would have expired by `now`. Returns the count deleted.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
