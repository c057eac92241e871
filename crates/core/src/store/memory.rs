//! In-memory implementation of every store trait.
//!
//! All state sits behind one `Mutex`, so multi-record operations such as
//! consuming a code and validating its owner's email are atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    ConfirmationCodeStore, NewUser, RevocationStore, StoreError, UserRecord, UserStore,
};
use crate::confirmation::{ConfirmationCode, ConsumeOutcome};
use crate::types::{DbId, Timestamp};
use crate::users::is_email_login;

#[derive(Default)]
struct MemoryState {
    next_user_id: DbId,
    users: HashMap<DbId, UserRecord>,
    revoked: HashMap<String, Timestamp>,
    codes: HashMap<Uuid, ConfirmationCode>,
}

/// Process-local store used by tests and by the server when no database is
/// configured.
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    available: AtomicBool,
    code_writes_fail: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            available: AtomicBool::new(true),
            code_writes_fail: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: while unavailable every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every confirmation code write fail with
    /// [`StoreError::Unavailable`] while reads keep working.
    pub fn set_code_writes_failing(&self, failing: bool) {
        self.code_writes_fail.store(failing, Ordering::SeqCst);
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Flip a user's active flag. Returns `false` if the user does not exist.
    pub async fn set_active(&self, id: DbId, is_active: bool) -> bool {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                true
            }
            None => false,
        }
    }

    /// Number of live revocation entries.
    pub async fn revoked_count(&self) -> usize {
        self.state.lock().await.revoked.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".into()))
        }
    }

    fn check_code_writable(&self) -> Result<(), StoreError> {
        self.check_available()?;
        if self.code_writes_fail.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("confirmation code write failed".into()))
        } else {
            Ok(())
        }
    }
}

impl MemoryState {
    /// Insert a user unless its username or email collides with either column
    /// of an existing user.
    fn insert_user(&mut self, input: &NewUser) -> Result<UserRecord, StoreError> {
        let taken = |value: &str| {
            self.users
                .values()
                .any(|u| u.username == value || u.email == value)
        };
        if taken(&input.username) || taken(&input.email) {
            return Err(StoreError::Conflict(
                "username or email already registered".into(),
            ));
        }

        self.next_user_id += 1;
        let user = UserRecord {
            id: self.next_user_id,
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            role: input.role.clone(),
            is_active: true,
            email_validated: input.email_validated,
            created_at: chrono::Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let found = if is_email_login(login) {
            state.users.values().find(|u| u.email == login)
        } else {
            state.users.values().find(|u| u.username == login)
        };
        Ok(found.cloned())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserRecord>, StoreError> {
        self.check_available()?;
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, input: &NewUser) -> Result<UserRecord, StoreError> {
        self.check_available()?;
        self.state.lock().await.insert_user(input)
    }
}

#[async_trait]
impl RevocationStore for InMemoryStore {
    async fn revoke(&self, jti: &str, expires_at: Timestamp) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.revoked.contains_key(jti) {
            return Ok(false);
        }
        state.revoked.insert(jti.to_string(), expires_at);
        Ok(true)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.state.lock().await.revoked.contains_key(jti))
    }

    async fn reap(&self, now: Timestamp) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let before = state.revoked.len();
        state.revoked.retain(|_, expires_at| *expires_at > now);
        Ok((before - state.revoked.len()) as u64)
    }
}

#[async_trait]
impl ConfirmationCodeStore for InMemoryStore {
    async fn insert(&self, code: &ConfirmationCode) -> Result<(), StoreError> {
        self.check_code_writable()?;
        self.state.lock().await.codes.insert(code.id, code.clone());
        Ok(())
    }

    async fn create_user_with_code(
        &self,
        input: &NewUser,
        ttl_hours: i64,
        now: Timestamp,
    ) -> Result<(UserRecord, ConfirmationCode), StoreError> {
        self.check_code_writable()?;
        let mut state = self.state.lock().await;
        let user = state.insert_user(input)?;
        let code = ConfirmationCode::generate(user.id, ttl_hours, now);
        state.codes.insert(code.id, code.clone());
        Ok((user, code))
    }

    async fn find(&self, id: Uuid) -> Result<Option<ConfirmationCode>, StoreError> {
        self.check_available()?;
        Ok(self.state.lock().await.codes.get(&id).cloned())
    }

    async fn consume(&self, id: Uuid, now: Timestamp) -> Result<ConsumeOutcome, StoreError> {
        self.check_available()?;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(code) = state.codes.get_mut(&id) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        let outcome = code.redemption_outcome(now);
        if let ConsumeOutcome::Consumed { user_id } = outcome {
            code.consumed_at = Some(now);
            if let Some(user) = state.users.get_mut(&user_id) {
                user.email_validated = true;
            }
        }
        Ok(outcome)
    }

    async fn purge_expired_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let before = state.codes.len();
        state.codes.retain(|_, code| code.expires_at >= cutoff);
        Ok((before - state.codes.len()) as u64)
    }
}
