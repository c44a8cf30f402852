//! Shared utilities and common types for the events service.
//!
//! This crate provides functionality used across all other crates:
//! - Identifier types
//! - Field validation shared by request types and the aggregate
//! - Page-based pagination

pub mod ids;
pub mod pagination;
pub mod validation;

pub use ids::{ClubId, Id, IdError, UserId};
