//! HTTP route handlers.

pub mod collaborators;
pub mod events;
pub mod health;
pub mod organizers;
pub mod participants;
