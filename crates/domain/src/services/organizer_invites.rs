//! Organizer invitations: an organizer proposes a member of their own club
//! as a co-organizer of the event.

use chrono::Utc;
use shared::{ClubId, Id, UserId};

use super::{emit, fetch_user, load_event, require_owner, save_event, with_deadline};
use crate::error::DomainError;
use crate::models::{DomainEvent, DomainEventKind, Event, Organizer, OrganizerInvite};
use crate::ports::Ports;

#[derive(Clone)]
pub struct OrganizerInviteService {
    ports: Ports,
}

impl OrganizerInviteService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Invites `target_user_id` to organize on behalf of `club_id`, which
    /// must be the club the inviting organizer represents.
    pub async fn create(
        &self,
        caller: UserId,
        event_id: &Id,
        target_user_id: UserId,
        club_id: ClubId,
    ) -> Result<OrganizerInvite, DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        if event.status.is_closed() {
            return Err(DomainError::InvalidEventStatus);
        }
        let inviter = event
            .organizer(caller)
            .ok_or(DomainError::PermissionsDenied)?;
        if inviter.club_id != club_id {
            return Err(DomainError::ClubMismatch);
        }
        if event.is_organizer(target_user_id) {
            return Err(DomainError::UserAlreadyOrganizer);
        }
        if !self
            .ports
            .directory
            .is_club_member(target_user_id, club_id)
            .await?
        {
            return Err(DomainError::UserIsFromAnotherClub);
        }
        if with_deadline(self.ports.invites.find_organizer_invite(&event.id, target_user_id))
            .await?
            .is_some()
        {
            return Err(DomainError::InviteAlreadyExists);
        }

        let target = fetch_user(&self.ports, target_user_id).await?;
        let invite = OrganizerInvite::new(event.id.clone(), club_id, caller, target, Utc::now());
        with_deadline(self.ports.invites.create_organizer_invite(&invite))
            .await
            .map_err(|e| e.or_exists(DomainError::InviteAlreadyExists))?;

        tracing::info!(
            event_id = %event.id,
            invite_id = %invite.id,
            target_user_id = target_user_id,
            invited_by = caller,
            "Organizer invited"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id,
                caller,
                DomainEventKind::OrganizerInvited {
                    invite_id: invite.id.clone(),
                    user_id: target_user_id,
                },
            ),
        );
        Ok(invite)
    }

    /// Accepts an invite as its target user.
    ///
    /// Deleting the invite and adding the organizer run concurrently; both
    /// are awaited and the invite deletion reports first.
    pub async fn accept(&self, caller: UserId, invite_id: &Id) -> Result<Event, DomainError> {
        let invite = self.get_invite(invite_id).await?;
        if invite.target_user.id != caller {
            return Err(DomainError::PermissionsDenied);
        }

        if load_event(&self.ports, &invite.event_id).await?.status.is_closed() {
            return Err(DomainError::InvalidEventStatus);
        }

        let (deleted, updated) = tokio::join!(
            with_deadline(self.ports.invites.delete_organizer_invite(&invite.id)),
            self.add_invited_organizer(&invite),
        );
        deleted.map_err(|e| e.or_not_found(DomainError::InviteNotFound))?;
        let event = updated?;

        tracing::info!(
            event_id = %event.id,
            invite_id = %invite.id,
            user_id = caller,
            "Organizer invite accepted"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id.clone(),
                caller,
                DomainEventKind::OrganizerAdded { user_id: caller },
            ),
        );
        Ok(event)
    }

    pub async fn reject(&self, caller: UserId, invite_id: &Id) -> Result<(), DomainError> {
        let invite = self.get_invite(invite_id).await?;
        if invite.target_user.id != caller {
            return Err(DomainError::PermissionsDenied);
        }
        self.delete_invite(&invite).await?;
        tracing::info!(invite_id = %invite.id, user_id = caller, "Organizer invite rejected");
        Ok(())
    }

    /// Withdraws an invite. Allowed for the inviter and the event owner.
    pub async fn revoke(&self, caller: UserId, invite_id: &Id) -> Result<(), DomainError> {
        let invite = self.get_invite(invite_id).await?;
        if invite.invited_by_user_id != caller {
            let event = load_event(&self.ports, &invite.event_id).await?;
            require_owner(&event, caller)?;
        }
        self.delete_invite(&invite).await?;
        tracing::info!(invite_id = %invite.id, revoked_by = caller, "Organizer invite revoked");
        Ok(())
    }

    /// Removes an organizer. Allowed for the owner and for whoever invited
    /// that organizer; the owner can never be removed.
    pub async fn kick(
        &self,
        caller: UserId,
        event_id: &Id,
        user_id: UserId,
    ) -> Result<Event, DomainError> {
        let mut event = load_event(&self.ports, event_id).await?;
        if event.is_owner(user_id) {
            return Err(DomainError::UserIsEventOwner);
        }
        let organizer = event
            .organizer(user_id)
            .ok_or(DomainError::OrganizerNotFound)?;
        if !event.is_owner(caller) && organizer.invited_by_user_id != caller {
            return Err(DomainError::PermissionsDenied);
        }

        let expected = event.updated_at;
        event.remove_organizer(user_id)?;
        event.touch(Utc::now());
        save_event(&self.ports, &event, expected).await?;

        tracing::info!(event_id = %event.id, user_id = user_id, kicked_by = caller, "Organizer removed");
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id.clone(),
                caller,
                DomainEventKind::OrganizerRemoved { user_id },
            ),
        );
        Ok(event)
    }

    async fn get_invite(&self, invite_id: &Id) -> Result<OrganizerInvite, DomainError> {
        with_deadline(self.ports.invites.get_organizer_invite(invite_id))
            .await
            .map_err(|e| e.or_not_found(DomainError::InviteNotFound))
    }

    async fn delete_invite(&self, invite: &OrganizerInvite) -> Result<(), DomainError> {
        with_deadline(self.ports.invites.delete_organizer_invite(&invite.id))
            .await
            .map_err(|e| e.or_not_found(DomainError::InviteNotFound))
    }

    async fn add_invited_organizer(&self, invite: &OrganizerInvite) -> Result<Event, DomainError> {
        let mut event = load_event(&self.ports, &invite.event_id).await?;
        if event.status.is_closed() {
            return Err(DomainError::InvalidEventStatus);
        }
        let expected = event.updated_at;
        event.add_organizer(Organizer {
            user: invite.target_user.clone(),
            club_id: invite.club_id,
            invited_by_user_id: invite.invited_by_user_id,
        })?;
        event.touch(Utc::now());
        save_event(&self.ports, &event, expected).await?;
        Ok(event)
    }
}
