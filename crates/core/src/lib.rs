//! Domain layer for the marketplace authentication subsystem.
//!
//! This crate has zero internal dependencies so it can be shared by the
//! persistence layer (`obmin-db`) and the API layer (`obmin-api`).

pub mod confirmation;
pub mod error;
pub mod roles;
pub mod scheduling;
pub mod store;
pub mod types;
pub mod users;
