//! Well-known role name constants.
//!
//! These must match the values accepted by the `users.role` check constraint.

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";
