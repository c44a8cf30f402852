//! Fixtures shared by the service tests.

use chrono::{DateTime, TimeZone, Utc};
use shared::pagination::Page;
use shared::{ClubId, Id, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StoreError;
use crate::memory::{InMemoryAdapters, InMemoryDirectory, InMemoryEventStore};
use crate::models::{Club, CoverImage, Event, EventFilter, EventOrder, EventPatch, EventType, User};
use crate::ports::{EventStore, StoreResult};
use crate::services::{
    CollaboratorInviteService, EventService, ModerationPolicy, OrganizerInviteService,
    ParticipationService,
};

pub const OWNER: UserId = 10;
pub const OWNER_CLUB: ClubId = 1;
pub const MODERATOR: UserId = 99;

pub fn user(id: UserId) -> User {
    User {
        id,
        first_name: format!("First{}", id),
        last_name: format!("Last{}", id),
        avatar: None,
        barcode: format!("bc{}", id),
    }
}

pub fn club(id: ClubId) -> Club {
    Club {
        id,
        name: format!("Club {}", id),
        logo_url: None,
    }
}

/// Owner 10 manages club 1 ("Robotics"); moderator 99 exists; users 20-40
/// and 7-8 exist. Members: 20 and 21 of club 1, 30 of club 2.
pub fn directory() -> InMemoryDirectory {
    let mut directory = InMemoryDirectory::new()
        .with_user(User {
            id: OWNER,
            first_name: "A".into(),
            last_name: "B".into(),
            avatar: None,
            barcode: "x".into(),
        })
        .with_club(Club {
            id: OWNER_CLUB,
            name: "Robotics".into(),
            logo_url: None,
        })
        .with_club(club(2))
        .with_club(club(3))
        .with_manager(OWNER, OWNER_CLUB)
        .with_manager(40, 2)
        .with_member(20, OWNER_CLUB)
        .with_member(21, OWNER_CLUB)
        .with_member(30, 2);
    for id in [7, 8, 20, 21, 30, 40, MODERATOR] {
        directory = directory.with_user(user(id));
    }
    directory
}

/// Event store that loses the optimistic lock on the next update once armed,
/// as if another writer got there first.
pub struct ConflictingEventStore {
    inner: Arc<InMemoryEventStore>,
    fail_next: AtomicBool,
}

impl ConflictingEventStore {
    pub fn new(inner: Arc<InMemoryEventStore>) -> Self {
        Self {
            inner,
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next_update(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Whether an armed failure is still pending.
    pub fn armed(&self) -> bool {
        self.fail_next.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventStore for ConflictingEventStore {
    async fn create(&self, event: &Event) -> StoreResult<()> {
        self.inner.create(event).await
    }

    async fn get(&self, id: &Id) -> StoreResult<Event> {
        self.inner.get(id).await
    }

    async fn update(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::OptimisticLockingFailed);
        }
        self.inner.update(event, expected).await
    }

    async fn soft_delete(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()> {
        self.inner.soft_delete(event, expected).await
    }

    async fn list(
        &self,
        filter: &EventFilter,
        order: EventOrder,
        page: &Page,
    ) -> StoreResult<Vec<Event>> {
        self.inner.list(filter, order, page).await
    }

    async fn count(&self, filter: &EventFilter) -> StoreResult<i64> {
        self.inner.count(filter).await
    }
}

pub struct Harness {
    pub adapters: InMemoryAdapters,
    /// Every event write of the services goes through this store.
    pub conflicts: Arc<ConflictingEventStore>,
    pub events: EventService,
    pub organizers: OrganizerInviteService,
    pub collaborators: CollaboratorInviteService,
    pub participation: ParticipationService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_directory(directory())
    }

    pub fn with_directory(directory: InMemoryDirectory) -> Self {
        let adapters = InMemoryAdapters::new(directory);
        let conflicts = Arc::new(ConflictingEventStore::new(adapters.events.clone()));
        let mut ports = adapters.ports();
        ports.events = conflicts.clone();
        Self {
            events: EventService::new(ports.clone(), ModerationPolicy::new(vec![MODERATOR])),
            organizers: OrganizerInviteService::new(ports.clone()),
            collaborators: CollaboratorInviteService::new(ports.clone()),
            participation: ParticipationService::new(ports),
            adapters,
            conflicts,
        }
    }

    pub async fn draft(&self) -> Event {
        self.events.create(OWNER, OWNER_CLUB).await.unwrap()
    }

    /// A draft with every publish-required field set.
    pub async fn ready(&self, event_type: EventType) -> Event {
        let event = self.draft().await;
        let patch = EventPatch {
            title: "Robotics night".into(),
            event_type: Some(event_type),
            start_date: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap()),
            cover_images: vec![CoverImage {
                url: "u".into(),
                name: "c".into(),
                file_type: "image/png".into(),
                position: 1,
            }],
            ..Default::default()
        };
        let paths: Vec<String> = ["title", "type", "start_date", "end_date", "cover_images"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.events
            .update(OWNER, &event.id, patch, &paths)
            .await
            .unwrap()
    }

    /// An intra-club event that is live.
    pub async fn live(&self) -> Event {
        let event = self.ready(EventType::IntraClub).await;
        self.events.publish(OWNER, &event.id).await.unwrap()
    }

    pub async fn stored(&self, event_id: &Id) -> Event {
        self.adapters.events.raw(event_id).await.unwrap()
    }
}
