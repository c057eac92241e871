//! PostgreSQL persistence for users, revoked tokens and confirmation codes.
//!
//! - [`models`] -- `FromRow` structs matching table rows.
//! - [`repositories`] -- zero-sized repos taking `&PgPool`.
//! - [`store::PgStore`] -- adapter implementing the `obmin_core::store` traits.

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

pub mod models;
pub mod repositories;
pub mod store;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
///
/// `acquire_timeout` bounds how long a store call may wait for a connection;
/// an elapsed wait surfaces as an unavailable store, never as "not found".
pub async fn create_pool(
    database_url: &str,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Run a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
