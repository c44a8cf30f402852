//! Repository implementations of the domain store ports.

pub mod event;
pub mod invite;
pub mod participant;
pub mod snapshot;

pub use event::EventRepository;
pub use invite::InviteRepository;
pub use participant::ParticipantRepository;
pub use snapshot::SnapshotRepository;
