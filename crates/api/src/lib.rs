//! Obminyashka authentication service library.
//!
//! Exposes the token codec, authentication services, background jobs and
//! the HTTP surface so integration tests and the binary entrypoint can both
//! access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
