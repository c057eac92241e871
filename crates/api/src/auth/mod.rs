//! Authentication and authorization primitives.
//!
//! - [`jwt`] -- signed access/refresh token issuance and decoding.
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`authenticator`] -- per-request bearer token gate producing a [`authenticator::Principal`].
//! - [`service`] -- login, refresh rotation and logout.
//! - [`confirmation`] -- email confirmation code issuance, redemption and purge.

pub mod authenticator;
pub mod confirmation;
pub mod jwt;
pub mod password;
pub mod service;
