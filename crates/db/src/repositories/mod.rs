//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` (or a connection inside a transaction) as the first argument.

pub mod email_confirmation_code_repo;
pub mod revoked_token_repo;
pub mod user_repo;

pub use email_confirmation_code_repo::EmailConfirmationCodeRepo;
pub use revoked_token_repo::RevokedTokenRepo;
pub use user_repo::UserRepo;
