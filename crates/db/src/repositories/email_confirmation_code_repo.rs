//! Repository for the `email_confirmation_codes` table.

use obmin_core::confirmation::{ConfirmationCode, ConsumeOutcome};
use obmin_core::types::Timestamp;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::UserRepo;
use crate::models::email_confirmation_code::EmailConfirmationCode;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, issued_at, expires_at, consumed_at";

/// Provides persistence for email confirmation codes.
pub struct EmailConfirmationCodeRepo;

impl EmailConfirmationCodeRepo {
    /// Insert a freshly issued code.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        code: &ConfirmationCode,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO email_confirmation_codes (id, user_id, issued_at, expires_at, consumed_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(code.id)
        .bind(code.user_id)
        .bind(code.issued_at)
        .bind(code.expires_at)
        .bind(code.consumed_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Find a code by id, consumed or not.
    pub async fn find_by_id(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<EmailConfirmationCode>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM email_confirmation_codes WHERE id = $1");
        sqlx::query_as::<_, EmailConfirmationCode>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Redeem a code inside one transaction.
    ///
    /// The row is locked with `FOR UPDATE`, so concurrent redemptions of the
    /// same code serialize and only the first sees it unconsumed. On success
    /// the owner's email is validated in the same transaction.
    pub async fn consume(
        pool: &PgPool,
        id: Uuid,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query =
            format!("SELECT {COLUMNS} FROM email_confirmation_codes WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, EmailConfirmationCode>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(ConsumeOutcome::NotFound);
        };

        let outcome = ConfirmationCode::from(row).redemption_outcome(now);
        match outcome {
            ConsumeOutcome::Consumed { user_id } => {
                sqlx::query("UPDATE email_confirmation_codes SET consumed_at = $2 WHERE id = $1")
                    .bind(id)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                UserRepo::mark_email_validated(&mut *tx, user_id).await?;
                tx.commit().await?;
            }
            ConsumeOutcome::NotFound | ConsumeOutcome::Expired => {
                tx.rollback().await?;
            }
        }
        Ok(outcome)
    }

    /// Delete codes whose expiry is strictly before `cutoff`. Returns the count deleted.
    pub async fn delete_expired_before(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_confirmation_codes WHERE expires_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
