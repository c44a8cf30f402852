//! Domain models for the events service.

pub mod domain_event;
pub mod event;
pub mod file;
pub mod filter;
pub mod invite;
pub mod participant;
pub mod patch;
pub mod user;

pub use domain_event::{DomainEvent, DomainEventKind};
pub use event::{ApproveMetadata, Event, EventStatus, EventType, Organizer, RejectMetadata};
pub use file::{CoverImage, File};
pub use filter::{EventFilter, EventOrder, SortBy, SortOrder};
pub use invite::{ClubInvite, EventInvites, InviteAction, OrganizerInvite};
pub use participant::{BanRecord, BanRequest, Participant};
pub use patch::{EventPatch, UpdatePath};
pub use user::{Club, Permission, User};
