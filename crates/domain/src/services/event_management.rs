//! Event creation, editing and lifecycle transitions.

use chrono::{DateTime, Utc};
use shared::pagination::{Page, PageInfo, MAX_PAGE_SIZE};
use shared::{ClubId, Id, UserId};
use validator::Validate;

use super::{
    emit, fetch_club, fetch_user, load_event, require_organizer, require_owner, save_event,
    validation_message, with_deadline, SYSTEM_ACTOR,
};
use crate::error::DomainError;
use crate::models::{
    DomainEvent, DomainEventKind, Event, EventFilter, EventInvites, EventOrder, EventPatch,
    EventStatus, Permission, UpdatePath,
};
use crate::ports::Ports;

/// Who may approve and reject events sent to review.
#[derive(Debug, Clone, Default)]
pub struct ModerationPolicy {
    /// Empty means any user other than the owner.
    pub moderator_ids: Vec<UserId>,
}

impl ModerationPolicy {
    pub fn new(moderator_ids: Vec<UserId>) -> Self {
        Self { moderator_ids }
    }

    pub fn can_moderate(&self, user_id: UserId, event: &Event) -> bool {
        !event.is_owner(user_id)
            && (self.moderator_ids.is_empty() || self.moderator_ids.contains(&user_id))
    }
}

/// Parameters of an event listing.
#[derive(Debug, Clone, Default)]
pub struct EventListQuery {
    pub club_id: Option<ClubId>,
    pub owner_user_id: Option<UserId>,
    pub tags: Vec<String>,
    pub starts_after: Option<DateTime<Utc>>,
    pub ends_before: Option<DateTime<Utc>>,
    pub statuses: Vec<EventStatus>,
    pub hide_private: bool,
    pub order: EventOrder,
    pub page: Page,
}

#[derive(Clone)]
pub struct EventService {
    ports: Ports,
    moderation: ModerationPolicy,
}

impl EventService {
    pub fn new(ports: Ports, moderation: ModerationPolicy) -> Self {
        Self { ports, moderation }
    }

    /// Creates a draft event owned by `caller` on behalf of `club_id`.
    pub async fn create(&self, caller: UserId, club_id: ClubId) -> Result<Event, DomainError> {
        let (allowed, user, club) = tokio::join!(
            self.ports
                .directory
                .has_permission(caller, club_id, Permission::ManageEvents),
            fetch_user(&self.ports, caller),
            fetch_club(&self.ports, club_id),
        );
        if !allowed? {
            return Err(DomainError::PermissionsDenied);
        }
        let event = Event::new(Id::generate(), user?, &club?, Utc::now());

        with_deadline(self.ports.events.create(&event)).await?;

        tracing::info!(
            event_id = %event.id,
            owner_user_id = caller,
            club_id = club_id,
            "Event created"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(event.id.clone(), caller, DomainEventKind::Created),
        );
        Ok(event)
    }

    /// Public events are readable by anyone; others by organizers, and
    /// events under moderation also by moderators.
    pub async fn get(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        if event.status.is_public() || event.is_organizer(caller) {
            return Ok(event);
        }
        let under_moderation = matches!(
            event.status,
            EventStatus::Pending | EventStatus::Approved | EventStatus::Rejected
        );
        if under_moderation && self.moderation.can_moderate(caller, &event) {
            return Ok(event);
        }
        Err(DomainError::PermissionsDenied)
    }

    /// Lists events.
    ///
    /// Without statuses only live events are listed. Asking for any
    /// non-public status restricts the listing to events `caller` organizes.
    pub async fn list(
        &self,
        caller: UserId,
        query: EventListQuery,
    ) -> Result<(Vec<Event>, PageInfo), DomainError> {
        let statuses = if query.statuses.is_empty() {
            vec![EventStatus::InProgress]
        } else {
            query.statuses
        };
        let private_statuses = statuses.iter().any(|s| !s.is_public());

        let mut filter = EventFilter {
            club_id: query.club_id,
            owner_user_id: query.owner_user_id,
            organizer_user_id: None,
            tags: query.tags,
            starts_after: query.starts_after,
            starts_before: None,
            ends_before: query.ends_before,
            statuses,
            hide_private: query.hide_private,
            visible_club_ids: Vec::new(),
        };

        if private_statuses {
            filter.organizer_user_id = Some(caller);
            filter.hide_private = false;
        } else if filter.hide_private {
            if let Some(club_id) = filter.club_id {
                if self.ports.directory.is_club_member(caller, club_id).await? {
                    filter.visible_club_ids.push(club_id);
                }
            }
        }

        let (events, total) = tokio::try_join!(
            with_deadline(self.ports.events.list(&filter, query.order, &query.page)),
            with_deadline(self.ports.events.count(&filter)),
        )?;
        Ok((events, PageInfo::new(&query.page, total)))
    }

    /// Applies the fields named in `paths`. Only the owner may edit, and only
    /// while the event is a draft or was rejected.
    pub async fn update(
        &self,
        caller: UserId,
        event_id: &Id,
        patch: EventPatch,
        paths: &[String],
    ) -> Result<Event, DomainError> {
        patch
            .validate()
            .map_err(|e| DomainError::InvalidArgument(validation_message(&e)))?;
        let paths = UpdatePath::parse_mask(paths)?;

        let mut event = load_event(&self.ports, event_id).await?;
        require_owner(&event, caller)?;
        if !event.status.is_editable() {
            return Err(DomainError::InvalidEventStatus);
        }

        let expected = event.updated_at;
        if !event.apply_update(&patch, &paths, Utc::now())? {
            return Ok(event);
        }
        save_event(&self.ports, &event, expected).await?;

        tracing::info!(
            event_id = %event.id,
            paths = ?paths.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            "Event updated"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(event.id.clone(), caller, DomainEventKind::Updated),
        );
        Ok(event)
    }

    /// Archives the event and drops its pending invites.
    pub async fn delete(&self, caller: UserId, event_id: &Id) -> Result<(), DomainError> {
        let mut event = load_event(&self.ports, event_id).await?;
        require_owner(&event, caller)?;

        let from = event.status;
        let expected = event.updated_at;
        event.archive(Utc::now())?;
        with_deadline(self.ports.events.soft_delete(&event, expected))
            .await
            .map_err(|e| e.or_not_found(DomainError::EventNotFound))?;

        if let Err(e) = with_deadline(self.ports.invites.delete_by_event(&event.id)).await {
            tracing::warn!(event_id = %event.id, error = %e, "Failed to drop invites of deleted event");
        }

        tracing::info!(event_id = %event.id, "Event archived");
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id.clone(),
                caller,
                DomainEventKind::StatusChanged {
                    from,
                    to: EventStatus::Archived,
                },
            ),
        );
        Ok(())
    }

    pub async fn publish(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        self.owner_transition(caller, event_id, |event, now| event.publish(now))
            .await
    }

    pub async fn unpublish(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        self.owner_transition(caller, event_id, |event, now| event.unpublish(now))
            .await
    }

    pub async fn send_to_review(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        self.owner_transition(caller, event_id, |event, now| event.send_to_review(now))
            .await
    }

    pub async fn revoke_review(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        self.owner_transition(caller, event_id, |event, now| event.revoke_review(now))
            .await
    }

    pub async fn cancel(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        self.owner_transition(caller, event_id, |event, now| event.cancel(now))
            .await
    }

    pub async fn finish(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        self.owner_transition(caller, event_id, |event, now| event.finish(now))
            .await
    }

    pub async fn approve(&self, caller: UserId, event_id: &Id) -> Result<Event, DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        if !self.moderation.can_moderate(caller, &event) {
            return Err(DomainError::PermissionsDenied);
        }
        if event.status != EventStatus::Pending {
            return Err(DomainError::InvalidEventStatus);
        }
        let moderator = fetch_user(&self.ports, caller).await?;
        self.persist_transition(caller, event, move |event, now| {
            event.approve(moderator, now)
        })
        .await
    }

    pub async fn reject(
        &self,
        caller: UserId,
        event_id: &Id,
        reason: String,
    ) -> Result<Event, DomainError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(DomainError::InvalidArgument("reason must not be empty".into()));
        }
        if reason.chars().count() as u64 > shared::validation::MAX_REASON_LEN {
            return Err(DomainError::InvalidArgument(
                "reason must be at most 1000 characters".into(),
            ));
        }

        let event = load_event(&self.ports, event_id).await?;
        if !self.moderation.can_moderate(caller, &event) {
            return Err(DomainError::PermissionsDenied);
        }
        if event.status != EventStatus::Pending {
            return Err(DomainError::InvalidEventStatus);
        }
        let moderator = fetch_user(&self.ports, caller).await?;
        self.persist_transition(caller, event, move |event, now| {
            event.reject(moderator, reason, now)
        })
        .await
    }

    /// Pending invites of an event, for its organizers.
    pub async fn list_invites(
        &self,
        caller: UserId,
        event_id: &Id,
    ) -> Result<EventInvites, DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        require_organizer(&event, caller)?;

        let (club_invites, organizer_invites) = tokio::try_join!(
            with_deadline(self.ports.invites.list_club_invites(&event.id)),
            with_deadline(self.ports.invites.list_organizer_invites(&event.id)),
        )?;
        Ok(EventInvites {
            club_invites,
            organizer_invites,
        })
    }

    /// Finishes live events whose end date has passed.
    ///
    /// Handles at most one page per call; conflicts are left for the next
    /// call. Returns the number of events finished.
    pub async fn finish_overdue(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let filter = EventFilter {
            statuses: vec![EventStatus::InProgress],
            ends_before: Some(now),
            ..Default::default()
        };
        let page = Page::new(Some(1), Some(MAX_PAGE_SIZE))?;
        let overdue =
            with_deadline(self.ports.events.list(&filter, EventOrder::default(), &page)).await?;

        let mut finished = 0;
        for event in overdue.into_iter().filter(|e| e.is_overdue(now)) {
            let event_id = event.id.clone();
            match self
                .persist_transition(SYSTEM_ACTOR, event, |event, now| event.finish(now))
                .await
            {
                Ok(_) => finished += 1,
                Err(e) => {
                    tracing::warn!(event_id = %event_id, error = %e, "Failed to finish overdue event")
                }
            }
        }
        Ok(finished)
    }

    async fn owner_transition<F>(
        &self,
        caller: UserId,
        event_id: &Id,
        apply: F,
    ) -> Result<Event, DomainError>
    where
        F: FnOnce(&mut Event, DateTime<Utc>) -> Result<(), DomainError> + Send,
    {
        let event = load_event(&self.ports, event_id).await?;
        require_owner(&event, caller)?;
        self.persist_transition(caller, event, apply).await
    }

    async fn persist_transition<F>(
        &self,
        actor: UserId,
        mut event: Event,
        apply: F,
    ) -> Result<Event, DomainError>
    where
        F: FnOnce(&mut Event, DateTime<Utc>) -> Result<(), DomainError> + Send,
    {
        let from = event.status;
        let expected = event.updated_at;
        apply(&mut event, Utc::now())?;
        save_event(&self.ports, &event, expected).await?;

        tracing::info!(
            event_id = %event.id,
            from = %from,
            to = %event.status,
            actor_user_id = actor,
            "Event status changed"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id.clone(),
                actor,
                DomainEventKind::StatusChanged {
                    from,
                    to: event.status,
                },
            ),
        );
        Ok(event)
    }
}
