//! In-memory adapters for every port.
//!
//! Used by service tests and by the HTTP tests of the api crate. The event
//! store honours the same compare-and-set contract as the PostgreSQL one.

use chrono::{DateTime, Utc};
use shared::pagination::Page;
use shared::{ClubId, Id, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{DirectoryError, StoreError};
use crate::models::{
    BanRecord, Club, ClubInvite, DomainEvent, Event, EventFilter, EventOrder, OrganizerInvite,
    Participant, Permission, User,
};
use crate::ports::{
    Directory, DirectoryResult, DomainEventPublisher, EventStore, InviteStore, ParticipantStore,
    Ports, PublishError, SnapshotStore, StoreResult,
};

// ============================================================================
// Event Store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored copy regardless of soft deletion.
    pub async fn raw(&self, id: &Id) -> Option<Event> {
        self.events.read().await.get(id.as_str()).cloned()
    }

    async fn compare_and_set(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()> {
        let mut events = self.events.write().await;
        let stored = events
            .get_mut(event.id.as_str())
            .filter(|e| e.deleted_at.is_none())
            .ok_or(StoreError::NotFound)?;
        if stored.updated_at != expected {
            return Err(StoreError::OptimisticLockingFailed);
        }
        *stored = event.clone();
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn create(&self, event: &Event) -> StoreResult<()> {
        let mut events = self.events.write().await;
        if events.contains_key(event.id.as_str()) {
            return Err(StoreError::AlreadyExists);
        }
        events.insert(event.id.to_string(), event.clone());
        Ok(())
    }

    async fn get(&self, id: &Id) -> StoreResult<Event> {
        self.events
            .read()
            .await
            .get(id.as_str())
            .filter(|e| e.deleted_at.is_none())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()> {
        self.compare_and_set(event, expected).await
    }

    async fn soft_delete(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()> {
        self.compare_and_set(event, expected).await
    }

    async fn list(
        &self,
        filter: &EventFilter,
        order: EventOrder,
        page: &Page,
    ) -> StoreResult<Vec<Event>> {
        let events = self.events.read().await;
        let mut matching: Vec<Event> = events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| order.compare(a, b));
        Ok(matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count(&self, filter: &EventFilter) -> StoreResult<i64> {
        let events = self.events.read().await;
        Ok(events.values().filter(|e| filter.matches(e)).count() as i64)
    }
}

// ============================================================================
// Invite Store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryInviteStore {
    club_invites: RwLock<HashMap<String, ClubInvite>>,
    organizer_invites: RwLock<HashMap<String, OrganizerInvite>>,
}

impl InMemoryInviteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl InviteStore for InMemoryInviteStore {
    async fn create_club_invite(&self, invite: &ClubInvite) -> StoreResult<()> {
        let mut invites = self.club_invites.write().await;
        if invites
            .values()
            .any(|i| i.event_id == invite.event_id && i.club.id == invite.club.id)
        {
            return Err(StoreError::AlreadyExists);
        }
        invites.insert(invite.id.to_string(), invite.clone());
        Ok(())
    }

    async fn get_club_invite(&self, id: &Id) -> StoreResult<ClubInvite> {
        self.club_invites
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_club_invite(
        &self,
        event_id: &Id,
        club_id: ClubId,
    ) -> StoreResult<Option<ClubInvite>> {
        Ok(self
            .club_invites
            .read()
            .await
            .values()
            .find(|i| &i.event_id == event_id && i.club.id == club_id)
            .cloned())
    }

    async fn delete_club_invite(&self, id: &Id) -> StoreResult<()> {
        self.club_invites
            .write()
            .await
            .remove(id.as_str())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_club_invites(&self, event_id: &Id) -> StoreResult<Vec<ClubInvite>> {
        let mut invites: Vec<ClubInvite> = self
            .club_invites
            .read()
            .await
            .values()
            .filter(|i| &i.event_id == event_id)
            .cloned()
            .collect();
        invites.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(invites)
    }

    async fn create_organizer_invite(&self, invite: &OrganizerInvite) -> StoreResult<()> {
        let mut invites = self.organizer_invites.write().await;
        if invites.values().any(|i| {
            i.event_id == invite.event_id && i.target_user.id == invite.target_user.id
        }) {
            return Err(StoreError::AlreadyExists);
        }
        invites.insert(invite.id.to_string(), invite.clone());
        Ok(())
    }

    async fn get_organizer_invite(&self, id: &Id) -> StoreResult<OrganizerInvite> {
        self.organizer_invites
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_organizer_invite(
        &self,
        event_id: &Id,
        user_id: UserId,
    ) -> StoreResult<Option<OrganizerInvite>> {
        Ok(self
            .organizer_invites
            .read()
            .await
            .values()
            .find(|i| &i.event_id == event_id && i.target_user.id == user_id)
            .cloned())
    }

    async fn delete_organizer_invite(&self, id: &Id) -> StoreResult<()> {
        self.organizer_invites
            .write()
            .await
            .remove(id.as_str())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_organizer_invites(&self, event_id: &Id) -> StoreResult<Vec<OrganizerInvite>> {
        let mut invites: Vec<OrganizerInvite> = self
            .organizer_invites
            .read()
            .await
            .values()
            .filter(|i| &i.event_id == event_id)
            .cloned()
            .collect();
        invites.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(invites)
    }

    async fn delete_by_event(&self, event_id: &Id) -> StoreResult<u64> {
        let mut clubs = self.club_invites.write().await;
        let mut organizers = self.organizer_invites.write().await;
        let before = clubs.len() + organizers.len();
        clubs.retain(|_, i| &i.event_id != event_id);
        organizers.retain(|_, i| &i.event_id != event_id);
        Ok((before - clubs.len() - organizers.len()) as u64)
    }
}

// ============================================================================
// Participant Store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryParticipantStore {
    participants: RwLock<Vec<Participant>>,
    bans: RwLock<Vec<BanRecord>>,
}

impl InMemoryParticipantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ParticipantStore for InMemoryParticipantStore {
    async fn create(&self, participant: &Participant) -> StoreResult<()> {
        let mut participants = self.participants.write().await;
        if participants
            .iter()
            .any(|p| p.event_id == participant.event_id && p.user.id == participant.user.id)
        {
            return Err(StoreError::AlreadyExists);
        }
        participants.push(participant.clone());
        Ok(())
    }

    async fn get(&self, event_id: &Id, user_id: UserId) -> StoreResult<Participant> {
        self.participants
            .read()
            .await
            .iter()
            .find(|p| &p.event_id == event_id && p.user.id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, event_id: &Id, user_id: UserId) -> StoreResult<()> {
        let mut participants = self.participants.write().await;
        let index = participants
            .iter()
            .position(|p| &p.event_id == event_id && p.user.id == user_id)
            .ok_or(StoreError::NotFound)?;
        participants.remove(index);
        Ok(())
    }

    async fn list(&self, event_id: &Id, page: &Page) -> StoreResult<Vec<Participant>> {
        let mut participants: Vec<Participant> = self
            .participants
            .read()
            .await
            .iter()
            .filter(|p| &p.event_id == event_id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user.id.cmp(&b.user.id)));
        Ok(participants
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn count(&self, event_id: &Id) -> StoreResult<i64> {
        Ok(self
            .participants
            .read()
            .await
            .iter()
            .filter(|p| &p.event_id == event_id)
            .count() as i64)
    }

    async fn create_ban(&self, ban: &BanRecord) -> StoreResult<()> {
        let mut bans = self.bans.write().await;
        if bans
            .iter()
            .any(|b| b.event_id == ban.event_id && b.user.id == ban.user.id)
        {
            return Err(StoreError::AlreadyExists);
        }
        bans.push(ban.clone());
        Ok(())
    }

    async fn get_ban(&self, event_id: &Id, user_id: UserId) -> StoreResult<Option<BanRecord>> {
        Ok(self
            .bans
            .read()
            .await
            .iter()
            .find(|b| &b.event_id == event_id && b.user.id == user_id)
            .cloned())
    }

    async fn delete_ban(&self, event_id: &Id, user_id: UserId) -> StoreResult<()> {
        let mut bans = self.bans.write().await;
        let index = bans
            .iter()
            .position(|b| &b.event_id == event_id && b.user.id == user_id)
            .ok_or(StoreError::NotFound)?;
        bans.remove(index);
        Ok(())
    }
}

// ============================================================================
// Snapshot Store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    users: RwLock<HashMap<UserId, User>>,
    clubs: RwLock<HashMap<ClubId, Club>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user(&self, user_id: UserId) -> Option<User> {
        self.users.read().await.get(&user_id).cloned()
    }

    pub async fn club(&self, club_id: ClubId) -> Option<Club> {
        self.clubs.read().await.get(&club_id).cloned()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn upsert_user(&self, user: &User) -> StoreResult<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let stored = users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        *stored = user.clone();
        Ok(())
    }

    async fn upsert_club(&self, club: &Club) -> StoreResult<()> {
        self.clubs.write().await.insert(club.id, club.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.user(user_id).await)
    }

    async fn get_club(&self, club_id: ClubId) -> StoreResult<Option<Club>> {
        Ok(self.club(club_id).await)
    }
}

// ============================================================================
// Directory
// ============================================================================

/// A fixed directory assembled with builder calls.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: HashMap<UserId, User>,
    clubs: HashMap<ClubId, Club>,
    members: HashSet<(UserId, ClubId)>,
    club_bans: HashSet<(UserId, ClubId)>,
    permissions: HashSet<(UserId, ClubId, Permission)>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn with_club(mut self, club: Club) -> Self {
        self.clubs.insert(club.id, club);
        self
    }

    pub fn with_member(mut self, user_id: UserId, club_id: ClubId) -> Self {
        self.members.insert((user_id, club_id));
        self
    }

    /// Membership plus event-management rights in the club.
    pub fn with_manager(mut self, user_id: UserId, club_id: ClubId) -> Self {
        self.members.insert((user_id, club_id));
        self.permissions
            .insert((user_id, club_id, Permission::ManageEvents));
        self
    }

    pub fn with_club_ban(mut self, user_id: UserId, club_id: ClubId) -> Self {
        self.club_bans.insert((user_id, club_id));
        self
    }
}

#[async_trait::async_trait]
impl Directory for InMemoryDirectory {
    async fn get_user(&self, user_id: UserId) -> DirectoryResult<User> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn get_club(&self, club_id: ClubId) -> DirectoryResult<Club> {
        self.clubs
            .get(&club_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn is_club_member(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool> {
        Ok(self.members.contains(&(user_id, club_id)))
    }

    async fn is_banned_in_club(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool> {
        Ok(self.club_bans.contains(&(user_id, club_id)))
    }

    async fn has_permission(
        &self,
        user_id: UserId,
        club_id: ClubId,
        permission: Permission,
    ) -> DirectoryResult<bool> {
        Ok(self.permissions.contains(&(user_id, club_id, permission)))
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// Keeps every published domain event for inspection.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<DomainEvent> {
        self.published.lock().await.clone()
    }

    /// Waits until an event with `routing_key` was published, for at most
    /// `timeout`. Publishing runs on spawned tasks.
    pub async fn wait_for(&self, routing_key: &str, timeout: std::time::Duration) -> bool {
        let poll = async {
            loop {
                if self
                    .published
                    .lock()
                    .await
                    .iter()
                    .any(|e| e.routing_key() == routing_key)
                {
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }
}

#[async_trait::async_trait]
impl DomainEventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        self.published.lock().await.push(event.clone());
        Ok(())
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Every in-memory adapter, with typed handles kept for assertions.
#[derive(Clone)]
pub struct InMemoryAdapters {
    pub events: Arc<InMemoryEventStore>,
    pub invites: Arc<InMemoryInviteStore>,
    pub participants: Arc<InMemoryParticipantStore>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub publisher: Arc<RecordingPublisher>,
}

impl InMemoryAdapters {
    pub fn new(directory: InMemoryDirectory) -> Self {
        Self {
            events: Arc::new(InMemoryEventStore::new()),
            invites: Arc::new(InMemoryInviteStore::new()),
            participants: Arc::new(InMemoryParticipantStore::new()),
            snapshots: Arc::new(InMemorySnapshotStore::new()),
            directory: Arc::new(directory),
            publisher: Arc::new(RecordingPublisher::new()),
        }
    }

    pub fn ports(&self) -> Ports {
        Ports {
            events: self.events.clone(),
            invites: self.invites.clone(),
            participants: self.participants.clone(),
            snapshots: self.snapshots.clone(),
            directory: self.directory.clone(),
            publisher: self.publisher.clone(),
        }
    }
}
