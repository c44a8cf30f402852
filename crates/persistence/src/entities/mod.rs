//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod event;
pub mod invite;
pub mod participant;
pub mod snapshot;

pub use event::{EventEntity, EVENT_COLUMNS};
pub use invite::{ClubInviteEntity, OrganizerInviteEntity};
pub use participant::{BanRecordEntity, ParticipantEntity};
pub use snapshot::{ClubSnapshotEntity, UserSnapshotEntity};
