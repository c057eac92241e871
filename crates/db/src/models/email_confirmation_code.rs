//! Email confirmation code model.

use obmin_core::confirmation::ConfirmationCode;
use obmin_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `email_confirmation_codes` table.
#[derive(Debug, Clone, FromRow)]
pub struct EmailConfirmationCode {
    pub id: Uuid,
    pub user_id: DbId,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
}

impl From<EmailConfirmationCode> for ConfirmationCode {
    fn from(row: EmailConfirmationCode) -> Self {
        ConfirmationCode {
            id: row.id,
            user_id: row.user_id,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            consumed_at: row.consumed_at,
        }
    }
}
