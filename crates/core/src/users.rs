//! Username rules shared by registration and OAuth2 account creation.
//!
//! A username never contains `@`, so a login string containing `@` is always
//! an email and one without it is always a username. This keeps the two
//! columns from shadowing each other at login.

pub const USERNAME_MIN_LENGTH: usize = 2;
pub const USERNAME_MAX_LENGTH: usize = 50;

/// Fallback base for OAuth2 identities whose name and email local part are
/// both unusable.
const FALLBACK_USERNAME: &str = "user";

/// Check a requested username against the shared rules.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len) {
        return Err(format!(
            "Username must be {USERNAME_MIN_LENGTH}-{USERNAME_MAX_LENGTH} characters"
        ));
    }
    if username.trim() != username || username.trim().is_empty() {
        return Err("Username must not start or end with whitespace".to_string());
    }
    if username.contains('@') {
        return Err("Username must not contain '@'".to_string());
    }
    Ok(())
}

/// Whether `login` names an email rather than a username.
pub fn is_email_login(login: &str) -> bool {
    login.contains('@')
}

/// Derive a username for an account created from an OAuth2 identity.
///
/// Prefers the provider's display name, then the email local part, then a
/// fixed fallback. The result always satisfies [`validate_username`].
pub fn username_from_identity(name: Option<&str>, email: &str) -> String {
    let local_part = email.split('@').next().unwrap_or_default();
    [name.unwrap_or_default(), local_part]
        .into_iter()
        .map(|candidate| {
            let cleaned: String = candidate.trim().chars().filter(|c| *c != '@').collect();
            truncate(cleaned.trim(), USERNAME_MAX_LENGTH)
        })
        .find(|candidate| validate_username(candidate).is_ok())
        .unwrap_or_else(|| FALLBACK_USERNAME.to_string())
}

/// Append `-suffix` to `base`, shortening `base` so the result stays within
/// [`USERNAME_MAX_LENGTH`].
pub fn with_suffix(base: &str, suffix: &str) -> String {
    let room = USERNAME_MAX_LENGTH.saturating_sub(suffix.chars().count() + 1);
    let head = truncate(base, room);
    format!("{}-{suffix}", head.trim_end())
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
