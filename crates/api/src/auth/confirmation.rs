//! Email confirmation codes: issuance, redemption and grace-period purge.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use obmin_core::confirmation::{purge_cutoff, ConfirmationCode, ConsumeOutcome};
use obmin_core::error::AuthError;
use obmin_core::scheduling::parse_time_of_day;
use obmin_core::store::{with_timeout, ConfirmationCodeStore, NewUser, StoreError, UserRecord};
use obmin_core::types::{DbId, Timestamp};
use uuid::Uuid;

/// Longest accepted code lifetime (30 days).
const MAX_CODE_TTL_HOURS: i64 = 30 * 24;
/// Longest accepted retention after expiry (10 years).
const MAX_GRACE_HOURS: i64 = 10 * 365 * 24;

/// Lifetime and retention settings for confirmation codes.
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Hours a freshly issued code stays redeemable (default: 24).
    pub code_ttl_hours: i64,
    /// Hours an expired code is retained before deletion (default: 168).
    pub grace_hours: i64,
    /// UTC time of day the purge job fires (default: 03:00).
    pub purge_at: NaiveTime,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            code_ttl_hours: 24,
            grace_hours: 168,
            purge_at: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default(),
        }
    }
}

impl ConfirmationConfig {
    /// Load from environment variables.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `CONFIRMATION_CODE_TTL_HOURS`  | `24`    |
    /// | `CONFIRMATION_GRACE_HOURS`     | `168`   |
    /// | `CONFIRMATION_PURGE_AT`        | `03:00` |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let code_ttl_hours = std::env::var("CONFIRMATION_CODE_TTL_HOURS")
            .ok()
            .map(|v| {
                v.parse()
                    .expect("CONFIRMATION_CODE_TTL_HOURS must be a valid i64")
            })
            .unwrap_or(defaults.code_ttl_hours);

        let grace_hours = std::env::var("CONFIRMATION_GRACE_HOURS")
            .ok()
            .map(|v| v.parse().expect("CONFIRMATION_GRACE_HOURS must be a valid i64"))
            .unwrap_or(defaults.grace_hours);

        let purge_at = std::env::var("CONFIRMATION_PURGE_AT")
            .ok()
            .map(|v| parse_time_of_day(&v).expect("CONFIRMATION_PURGE_AT must be HH:MM"))
            .unwrap_or(defaults.purge_at);

        let config = Self {
            code_ttl_hours,
            grace_hours,
            purge_at,
        };
        config
            .validate()
            .unwrap_or_else(|msg| panic!("Invalid confirmation configuration: {msg}"));
        config
    }

    /// Check that the code lifetime is positive and both values are bounded.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_CODE_TTL_HOURS).contains(&self.code_ttl_hours) {
            return Err(format!(
                "CONFIRMATION_CODE_TTL_HOURS must be between 1 and {MAX_CODE_TTL_HOURS}"
            ));
        }
        if !(0..=MAX_GRACE_HOURS).contains(&self.grace_hours) {
            return Err(format!(
                "CONFIRMATION_GRACE_HOURS must be between 0 and {MAX_GRACE_HOURS}"
            ));
        }
        Ok(())
    }
}

pub struct ConfirmationService {
    codes: Arc<dyn ConfirmationCodeStore>,
    ttl_hours: i64,
    store_timeout: Duration,
}

impl ConfirmationService {
    pub fn new(
        codes: Arc<dyn ConfirmationCodeStore>,
        ttl_hours: i64,
        store_timeout: Duration,
    ) -> Self {
        Self {
            codes,
            ttl_hours,
            store_timeout,
        }
    }

    /// Issue and persist a code for `user_id` using the configured lifetime.
    pub async fn issue(&self, user_id: DbId) -> Result<ConfirmationCode, StoreError> {
        self.issue_at(user_id, self.ttl_hours, Utc::now()).await
    }

    pub async fn issue_at(
        &self,
        user_id: DbId,
        ttl_hours: i64,
        now: Timestamp,
    ) -> Result<ConfirmationCode, StoreError> {
        let code = ConfirmationCode::generate(user_id, ttl_hours, now);
        with_timeout(self.store_timeout, self.codes.insert(&code)).await?;
        tracing::info!(user_id, expires_at = %code.expires_at, "Issued confirmation code");
        Ok(code)
    }

    /// Create `input` together with its first code. Nothing is persisted
    /// unless both writes succeed.
    pub async fn register(
        &self,
        input: &NewUser,
    ) -> Result<(UserRecord, ConfirmationCode), StoreError> {
        let (user, code) = with_timeout(
            self.store_timeout,
            self.codes.create_user_with_code(input, self.ttl_hours, Utc::now()),
        )
        .await?;
        tracing::info!(
            user_id = user.id,
            expires_at = %code.expires_at,
            "Created user with confirmation code"
        );
        Ok((user, code))
    }

    /// Redeem `id`, marking its owner's email validated. Returns the owner.
    pub async fn validate_and_consume(&self, id: Uuid) -> Result<DbId, AuthError> {
        self.validate_and_consume_at(id, Utc::now()).await
    }

    pub async fn validate_and_consume_at(
        &self,
        id: Uuid,
        now: Timestamp,
    ) -> Result<DbId, AuthError> {
        match with_timeout(self.store_timeout, self.codes.consume(id, now)).await? {
            ConsumeOutcome::Consumed { user_id } => {
                tracing::info!(user_id, "Email validated");
                Ok(user_id)
            }
            ConsumeOutcome::NotFound => Err(AuthError::ConfirmationCodeNotFound),
            ConsumeOutcome::Expired => Err(AuthError::ConfirmationCodeExpired),
        }
    }

    /// Delete every code whose expiry lies more than `grace_hours` before `now`.
    pub async fn purge_expired(&self, now: Timestamp, grace_hours: i64) -> Result<u64, StoreError> {
        let cutoff = purge_cutoff(now, grace_hours);
        with_timeout(self.store_timeout, self.codes.purge_expired_before(cutoff)).await
    }
}
