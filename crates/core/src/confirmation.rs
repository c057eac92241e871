//! Email confirmation code lifecycle rules.
//!
//! A code is a random UUID (128 bits) bound to one user. It can be redeemed
//! exactly once before `expires_at`; after expiry it is invalid whether or not
//! it was consumed. Expired records are kept for a grace period so support can
//! inspect them, then physically deleted by the purge job.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{DbId, Timestamp};

/// An issued email confirmation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationCode {
    pub id: Uuid,
    pub user_id: DbId,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    /// Set when the code was successfully redeemed.
    pub consumed_at: Option<Timestamp>,
}

impl ConfirmationCode {
    /// Generate a fresh code for `user_id` valid for `ttl_hours` from `now`.
    ///
    /// An expiry beyond the representable range saturates.
    pub fn generate(user_id: DbId, ttl_hours: i64, now: Timestamp) -> Self {
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: Uuid::new_v4(),
            user_id,
            issued_at: now,
            expires_at,
            consumed_at: None,
        }
    }

    /// A code is expired from the instant `now >= expires_at`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Decide the outcome of a redemption attempt at `now` without mutating.
    ///
    /// Expiry wins over consumption: an expired code reports `Expired` even if
    /// it was redeemed earlier.
    pub fn redemption_outcome(&self, now: Timestamp) -> ConsumeOutcome {
        if self.is_expired(now) {
            ConsumeOutcome::Expired
        } else if self.is_consumed() {
            ConsumeOutcome::NotFound
        } else {
            ConsumeOutcome::Consumed {
                user_id: self.user_id,
            }
        }
    }
}

/// Result of an atomic check-and-consume against a confirmation code store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This caller redeemed the code; the owner's email is now validated.
    Consumed { user_id: DbId },
    /// No such code, or it was already redeemed.
    NotFound,
    Expired,
}

/// Cut-off for physical deletion: a code with expiry `E` is purgeable iff
/// `now - E > grace`, i.e. `E < now - grace`.
/// A grace too large to represent saturates, so nothing is purgeable.
pub fn purge_cutoff(now: Timestamp, grace_hours: i64) -> Timestamp {
    Duration::try_hours(grace_hours)
        .and_then(|grace| now.checked_sub_signed(grace))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whether a code expiring at `expires_at` is past its grace window at `now`.
pub fn is_purgeable(expires_at: Timestamp, now: Timestamp, grace_hours: i64) -> bool {
    expires_at < purge_cutoff(now, grace_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn generated_code_expires_after_ttl() {
        let code = ConfirmationCode::generate(7, 24, t0());
        assert_eq!(code.issued_at, t0());
        assert_eq!(code.expires_at, t0() + Duration::hours(24));
        assert!(!code.is_consumed());
    }

    #[test]
    fn out_of_range_lifetimes_saturate() {
        let code = ConfirmationCode::generate(1, i64::MAX, t0());
        assert_eq!(code.expires_at, DateTime::<Utc>::MAX_UTC);
        assert_eq!(purge_cutoff(t0(), i64::MAX), DateTime::<Utc>::MIN_UTC);
        assert!(!is_purgeable(t0() - Duration::days(3650), t0(), i64::MAX));
    }

    #[test]
    fn generated_codes_are_unique() {
        let a = ConfirmationCode::generate(1, 1, t0());
        let b = ConfirmationCode::generate(1, 1, t0());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let code = ConfirmationCode::generate(1, 1, t0());
        assert!(!code.is_expired(t0() + Duration::minutes(59)));
        assert!(code.is_expired(t0() + Duration::hours(1)));
    }

    #[test]
    fn redemption_outcomes() {
        let mut code = ConfirmationCode::generate(3, 1, t0());
        assert_matches!(
            code.redemption_outcome(t0()),
            ConsumeOutcome::Consumed { user_id: 3 }
        );
        assert_eq!(
            code.redemption_outcome(t0() + Duration::hours(2)),
            ConsumeOutcome::Expired
        );

        code.consumed_at = Some(t0());
        assert_eq!(code.redemption_outcome(t0()), ConsumeOutcome::NotFound);
        assert_eq!(
            code.redemption_outcome(t0() + Duration::hours(2)),
            ConsumeOutcome::Expired
        );
    }

    #[test]
    fn purge_respects_grace_window() {
        let expired_at = t0();
        // Exactly at the grace boundary the record is kept.
        assert!(!is_purgeable(expired_at, t0() + Duration::hours(48), 48));
        assert!(is_purgeable(
            expired_at,
            t0() + Duration::hours(48) + Duration::seconds(1),
            48
        ));
        assert!(!is_purgeable(expired_at, t0() + Duration::hours(1), 48));
    }
}
