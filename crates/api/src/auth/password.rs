//! Argon2id password hashing and verification.
//!
//! Hashes are stored as PHC strings so the salt and parameters travel with
//! the hash. Users created through OAuth2 have no hash at all and can never
//! log in with a password.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; `Err` only when the stored hash itself
/// cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Hash verified against when there is no usable stored hash, so that path
/// costs one full Argon2id verification like a wrong password does.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("obmin-no-such-account").ok())
        .as_deref()
}

fn burn_verification(password: &str) {
    if let Some(hash) = dummy_hash() {
        let _ = verify_password(password, hash);
    }
}

/// Check a password against a possibly absent stored hash.
///
/// A missing or unparseable hash never matches, and takes as long to reject
/// as a wrong password.
pub fn password_matches(password: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(hash) => match verify_password(password, hash) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is unreadable");
                burn_verification(password);
                false
            }
        },
        None => {
            burn_verification(password);
            false
        }
    }
}

/// Validate that a password meets minimum strength requirements.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {min_length} characters long"
        ));
    }
    Ok(())
}
