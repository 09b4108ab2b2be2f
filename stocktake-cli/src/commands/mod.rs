//! CLI command implementations.

pub mod auth;
pub mod inventory;
pub mod progress;
