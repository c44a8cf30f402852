//! Joining and leaving events, kicks and bans.
//!
//! A participant record and the aggregate's counter are written in two
//! steps. When the aggregate write loses the optimistic lock, the record
//! write is undone on a best-effort basis. A ban whose participant could not
//! be removed is lifted again so the caller can retry.

use chrono::Utc;
use shared::pagination::{Page, PageInfo};
use shared::{Id, UserId};
use validator::Validate;

use super::{
    emit, fetch_user, load_event, require_organizer, save_event, validation_message,
    with_deadline,
};
use crate::error::{DomainError, StoreError};
use crate::models::{
    BanRecord, BanRequest, DomainEvent, DomainEventKind, Event, EventStatus, EventType,
    Participant,
};
use crate::ports::Ports;

#[derive(Clone)]
pub struct ParticipationService {
    ports: Ports,
}

impl ParticipationService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    pub async fn participate(&self, caller: UserId, event_id: &Id) -> Result<Participant, DomainError> {
        let mut event = load_event(&self.ports, event_id).await?;
        if event.status != EventStatus::InProgress {
            return Err(DomainError::InvalidEventStatus);
        }
        if !event.has_capacity() {
            return Err(DomainError::EventIsFull);
        }
        if with_deadline(self.ports.participants.get_ban(&event.id, caller))
            .await?
            .is_some()
        {
            return Err(DomainError::UserIsBanned);
        }
        if self
            .ports
            .directory
            .is_banned_in_club(caller, event.owner_club_id)
            .await?
        {
            return Err(DomainError::UserIsBanned);
        }
        if event.event_type == Some(EventType::IntraClub) && !self.is_host_member(caller, &event).await? {
            return Err(DomainError::PermissionsDenied);
        }
        match with_deadline(self.ports.participants.get(&event.id, caller)).await {
            Ok(_) => return Err(DomainError::AlreadyParticipating),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let user = fetch_user(&self.ports, caller).await?;
        let participant = Participant::new(event.id.clone(), user, Utc::now());
        with_deadline(self.ports.participants.create(&participant))
            .await
            .map_err(|e| e.or_exists(DomainError::AlreadyParticipating))?;

        let expected = event.updated_at;
        let saved = match event.join(Utc::now()) {
            Ok(()) => save_event(&self.ports, &event, expected).await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            self.undo_join(&participant).await;
            return Err(e);
        }

        tracing::info!(
            event_id = %event.id,
            user_id = caller,
            participants_count = event.participants_count,
            "User joined event"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id.clone(),
                caller,
                DomainEventKind::ParticipantJoined { user_id: caller },
            ),
        );
        Ok(participant)
    }

    pub async fn cancel(&self, caller: UserId, event_id: &Id) -> Result<(), DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        self.remove_participant(event, caller).await?;
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event_id.clone(),
                caller,
                DomainEventKind::ParticipantLeft { user_id: caller },
            ),
        );
        Ok(())
    }

    /// Removes a participant. Organizers only.
    pub async fn kick(&self, caller: UserId, event_id: &Id, user_id: UserId) -> Result<(), DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        require_organizer(&event, caller)?;
        self.remove_participant(event, user_id).await?;
        tracing::info!(event_id = %event_id, user_id = user_id, kicked_by = caller, "Participant kicked");
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event_id.clone(),
                caller,
                DomainEventKind::ParticipantLeft { user_id },
            ),
        );
        Ok(())
    }

    /// Bans a user from the event, removing their participation if any.
    pub async fn ban(
        &self,
        caller: UserId,
        event_id: &Id,
        request: BanRequest,
    ) -> Result<BanRecord, DomainError> {
        request
            .validate()
            .map_err(|e| DomainError::InvalidArgument(validation_message(&e)))?;

        let event = load_event(&self.ports, event_id).await?;
        require_organizer(&event, caller)?;
        if event.is_owner(request.user_id) {
            return Err(DomainError::UserIsEventOwner);
        }
        if with_deadline(self.ports.participants.get_ban(&event.id, request.user_id))
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyBanned);
        }

        let participant = match with_deadline(self.ports.participants.get(&event.id, request.user_id)).await {
            Ok(participant) => Some(participant),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let user = match &participant {
            Some(p) => p.user.clone(),
            None => fetch_user(&self.ports, request.user_id).await?,
        };

        let ban = BanRecord {
            event_id: event.id.clone(),
            user,
            reason: request.reason.trim().to_string(),
            banned_at: Utc::now(),
            banned_by_user_id: caller,
        };
        with_deadline(self.ports.participants.create_ban(&ban))
            .await
            .map_err(|e| e.or_exists(DomainError::UserAlreadyBanned))?;

        if participant.is_some() {
            match self.remove_participant(event, request.user_id).await {
                Ok(()) | Err(DomainError::ParticipantNotFound) => {}
                Err(e) => {
                    self.undo_ban(&ban).await;
                    return Err(e);
                }
            }
        }

        tracing::info!(
            event_id = %event_id,
            user_id = request.user_id,
            banned_by = caller,
            "Participant banned"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event_id.clone(),
                caller,
                DomainEventKind::ParticipantBanned {
                    user_id: request.user_id,
                },
            ),
        );
        Ok(ban)
    }

    /// Lifts a ban. Organizers only.
    pub async fn unban(&self, caller: UserId, event_id: &Id, user_id: UserId) -> Result<(), DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        require_organizer(&event, caller)?;
        with_deadline(self.ports.participants.delete_ban(&event.id, user_id))
            .await
            .map_err(|e| e.or_not_found(DomainError::BanRecordNotFound))?;
        tracing::info!(event_id = %event.id, user_id = user_id, "Participant unbanned");
        Ok(())
    }

    /// Participants of an event, for its organizers.
    pub async fn list(
        &self,
        caller: UserId,
        event_id: &Id,
        page: Page,
    ) -> Result<(Vec<Participant>, PageInfo), DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        require_organizer(&event, caller)?;
        let (participants, total) = tokio::try_join!(
            with_deadline(self.ports.participants.list(&event.id, &page)),
            with_deadline(self.ports.participants.count(&event.id)),
        )?;
        Ok((participants, PageInfo::new(&page, total)))
    }

    /// Whether the user belongs to the owner club or any collaborator club.
    async fn is_host_member(&self, user_id: UserId, event: &Event) -> Result<bool, DomainError> {
        for club_id in event.hosting_club_ids() {
            if self.ports.directory.is_club_member(user_id, club_id).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn remove_participant(&self, mut event: Event, user_id: UserId) -> Result<(), DomainError> {
        let participant = with_deadline(self.ports.participants.get(&event.id, user_id))
            .await
            .map_err(|e| e.or_not_found(DomainError::ParticipantNotFound))?;
        with_deadline(self.ports.participants.delete(&event.id, user_id))
            .await
            .map_err(|e| e.or_not_found(DomainError::ParticipantNotFound))?;

        let expected = event.updated_at;
        event.leave(Utc::now());
        if let Err(e) = save_event(&self.ports, &event, expected).await {
            if let Err(undo) = with_deadline(self.ports.participants.create(&participant)).await {
                tracing::warn!(
                    event_id = %event.id,
                    user_id = user_id,
                    error = %undo,
                    "Failed to restore participant after aborted leave"
                );
            }
            return Err(e);
        }
        tracing::info!(
            event_id = %event.id,
            user_id = user_id,
            participants_count = event.participants_count,
            "User left event"
        );
        Ok(())
    }

    async fn undo_ban(&self, ban: &BanRecord) {
        if let Err(e) = with_deadline(
            self.ports
                .participants
                .delete_ban(&ban.event_id, ban.user.id),
        )
        .await
        {
            tracing::warn!(
                event_id = %ban.event_id,
                user_id = ban.user.id,
                error = %e,
                "Failed to lift ban after aborted removal"
            );
        }
    }

    async fn undo_join(&self, participant: &Participant) {
        if let Err(e) = with_deadline(
            self.ports
                .participants
                .delete(&participant.event_id, participant.user.id),
        )
        .await
        {
            tracing::warn!(
                event_id = %participant.event_id,
                user_id = participant.user.id,
                error = %e,
                "Failed to remove participant after aborted join"
            );
        }
    }
}
