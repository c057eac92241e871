//! Row models.
//!
//! Each submodule contains a `FromRow` struct matching the table row and the
//! conversion into its `obmin_core` domain type.

pub mod email_confirmation_code;
pub mod user;
