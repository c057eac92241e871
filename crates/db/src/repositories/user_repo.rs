//! Repository for the `users` table.

use obmin_core::store::NewUser;
use obmin_core::types::DbId;
use obmin_core::users::is_email_login;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, password_hash, role, is_active, \
                        email_validated, created_at, updated_at";

/// Provides lookup and creation of users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    ///
    /// Returns `None` when the username or email already appears in either
    /// column of another user. Same-column races are still caught by the
    /// unique constraints.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, role, email_validated)
             SELECT $1, $2, $3, $4, $5
             WHERE NOT EXISTS (
                 SELECT 1 FROM users
                 WHERE username IN ($1, $2) OR email IN ($1, $2)
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.role)
            .bind(input.email_validated)
            .fetch_optional(executor)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email when `login` contains `@`, otherwise by username.
    pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
        if is_email_login(login) {
            return Self::find_by_email(pool, login).await;
        }
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-sensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Mark a user's email as validated. Runs on the caller's connection so it
    /// can share a transaction with code consumption.
    pub async fn mark_email_validated(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET email_validated = true, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
