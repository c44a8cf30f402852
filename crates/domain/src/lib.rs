//! Domain layer for the events service.
//!
//! This crate contains:
//! - Domain models (Event aggregate, invites, participants, snapshots)
//! - Ports implemented by the persistence and api crates
//! - Business logic services
//! - Domain error types
//! - In-memory adapters for tests

pub mod error;
pub mod memory;
pub mod models;
pub mod ports;
pub mod services;

pub use error::{DirectoryError, DomainError, StoreError};
pub use ports::Ports;
