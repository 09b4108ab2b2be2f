//! # Stocktake Shared Library
//!
//! This crate contains the local-first service layer of Stocktake: user
//! authentication, the per-user inventory catalog and the work-progress
//! snapshots that survive a sign-out/sign-in cycle.
//!
//! ## Module Organization
//!
//! - `storage`: Key-value store abstraction (file, in-memory, fast mirror)
//! - `models`: Persisted records (users, inventory items, work progress)
//! - `auth`: Session cell, credential hashing, reset tokens, federated sign-in
//! - `inventory`: Inventory catalog and surface-area calculator
//! - `progress`: Work-progress snapshot/restore
//! - `factory`: Hands out the services by capability trait
//! - `clock`: Injectable time source

pub mod auth;
pub mod clock;
pub mod factory;
pub mod inventory;
pub mod models;
pub mod progress;
pub mod storage;

/// Current version of the Stocktake shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
