//! Ports the services depend on.
//!
//! Stores are implemented by the persistence crate (PostgreSQL) and by
//! [`crate::memory`]; the directory and publisher by the api crate.

use chrono::{DateTime, Utc};
use shared::pagination::Page;
use shared::{ClubId, Id, UserId};
use std::sync::Arc;
use thiserror::Error;

use crate::error::{DirectoryError, StoreError};
use crate::models::{
    BanRecord, Club, ClubInvite, DomainEvent, Event, EventFilter, EventOrder, OrganizerInvite,
    Participant, Permission, User,
};

pub type StoreResult<T> = Result<T, StoreError>;
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Durable storage of event aggregates.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, event: &Event) -> StoreResult<()>;

    /// Fails with `NotFound` for missing and soft-deleted events.
    async fn get(&self, id: &Id) -> StoreResult<Event>;

    /// Replaces the stored event if its `updated_at` still equals `expected`.
    async fn update(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()>;

    /// Persists an archived event and hides it from reads.
    async fn soft_delete(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()>;

    async fn list(
        &self,
        filter: &EventFilter,
        order: EventOrder,
        page: &Page,
    ) -> StoreResult<Vec<Event>>;

    async fn count(&self, filter: &EventFilter) -> StoreResult<i64>;
}

/// Durable storage of pending club and organizer invites.
#[async_trait::async_trait]
pub trait InviteStore: Send + Sync {
    async fn create_club_invite(&self, invite: &ClubInvite) -> StoreResult<()>;
    async fn get_club_invite(&self, id: &Id) -> StoreResult<ClubInvite>;
    async fn find_club_invite(&self, event_id: &Id, club_id: ClubId)
        -> StoreResult<Option<ClubInvite>>;
    async fn delete_club_invite(&self, id: &Id) -> StoreResult<()>;
    async fn list_club_invites(&self, event_id: &Id) -> StoreResult<Vec<ClubInvite>>;

    async fn create_organizer_invite(&self, invite: &OrganizerInvite) -> StoreResult<()>;
    async fn get_organizer_invite(&self, id: &Id) -> StoreResult<OrganizerInvite>;
    async fn find_organizer_invite(
        &self,
        event_id: &Id,
        user_id: UserId,
    ) -> StoreResult<Option<OrganizerInvite>>;
    async fn delete_organizer_invite(&self, id: &Id) -> StoreResult<()>;
    async fn list_organizer_invites(&self, event_id: &Id) -> StoreResult<Vec<OrganizerInvite>>;

    /// Removes every invite of an event. Returns the number removed.
    async fn delete_by_event(&self, event_id: &Id) -> StoreResult<u64>;
}

/// Durable storage of participants and ban records.
#[async_trait::async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Fails with `AlreadyExists` when the user already participates.
    async fn create(&self, participant: &Participant) -> StoreResult<()>;
    async fn get(&self, event_id: &Id, user_id: UserId) -> StoreResult<Participant>;
    async fn delete(&self, event_id: &Id, user_id: UserId) -> StoreResult<()>;
    async fn list(&self, event_id: &Id, page: &Page) -> StoreResult<Vec<Participant>>;
    async fn count(&self, event_id: &Id) -> StoreResult<i64>;

    /// Fails with `AlreadyExists` when the user is already banned.
    async fn create_ban(&self, ban: &BanRecord) -> StoreResult<()>;
    async fn get_ban(&self, event_id: &Id, user_id: UserId) -> StoreResult<Option<BanRecord>>;
    async fn delete_ban(&self, event_id: &Id, user_id: UserId) -> StoreResult<()>;
}

/// Local copies of directory users and clubs.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn upsert_user(&self, user: &User) -> StoreResult<()>;

    /// Fails with `NotFound` when the user was never seen locally.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    async fn upsert_club(&self, club: &Club) -> StoreResult<()>;

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;
    async fn get_club(&self, club_id: ClubId) -> StoreResult<Option<Club>>;
}

/// Read access to the upstream user and club directories.
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    async fn get_user(&self, user_id: UserId) -> DirectoryResult<User>;
    async fn get_club(&self, club_id: ClubId) -> DirectoryResult<Club>;
    async fn is_club_member(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool>;
    async fn is_banned_in_club(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool>;
    async fn has_permission(
        &self,
        user_id: UserId,
        club_id: ClubId,
        permission: Permission,
    ) -> DirectoryResult<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to publish domain event: {0}")]
pub struct PublishError(pub String);

/// Sink for outbound domain events.
#[async_trait::async_trait]
pub trait DomainEventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;
}

/// Publisher that only logs, used when no broker is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingPublisher;

#[async_trait::async_trait]
impl DomainEventPublisher for LoggingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        tracing::info!(
            event_id = %event.event_id,
            actor_user_id = event.actor_user_id,
            kind = event.kind.name(),
            "Domain event"
        );
        Ok(())
    }
}

/// Every adapter a service may need, shared across services.
#[derive(Clone)]
pub struct Ports {
    pub events: Arc<dyn EventStore>,
    pub invites: Arc<dyn InviteStore>,
    pub participants: Arc<dyn ParticipantStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub directory: Arc<dyn Directory>,
    pub publisher: Arc<dyn DomainEventPublisher>,
}
