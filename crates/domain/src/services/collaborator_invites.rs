//! Club collaboration invitations: the owner proposes another club as
//! co-host, and a manager of that club answers.

use chrono::Utc;
use shared::{ClubId, Id, UserId};

use super::{emit, fetch_club, load_event, require_owner, save_event, with_deadline};
use crate::error::DomainError;
use crate::models::{ClubInvite, DomainEvent, DomainEventKind, Event, Permission};
use crate::ports::Ports;

#[derive(Clone)]
pub struct CollaboratorInviteService {
    ports: Ports,
}

impl CollaboratorInviteService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    pub async fn create(
        &self,
        caller: UserId,
        event_id: &Id,
        club_id: ClubId,
    ) -> Result<ClubInvite, DomainError> {
        let event = load_event(&self.ports, event_id).await?;
        if event.status.is_closed() {
            return Err(DomainError::InvalidEventStatus);
        }
        require_owner(&event, caller)?;
        if club_id == event.owner_club_id {
            return Err(DomainError::ClubIsEventOwner);
        }
        if event.is_collaborator(club_id) {
            return Err(DomainError::ClubAlreadyCollaborator);
        }
        if with_deadline(self.ports.invites.find_club_invite(&event.id, club_id))
            .await?
            .is_some()
        {
            return Err(DomainError::InviteAlreadyExists);
        }

        let club = fetch_club(&self.ports, club_id).await?;
        let invite = ClubInvite::new(event.id.clone(), club, Utc::now());
        with_deadline(self.ports.invites.create_club_invite(&invite))
            .await
            .map_err(|e| e.or_exists(DomainError::InviteAlreadyExists))?;

        tracing::info!(
            event_id = %event.id,
            invite_id = %invite.id,
            club_id = club_id,
            "Club invited to collaborate"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id,
                caller,
                DomainEventKind::ClubInvited {
                    invite_id: invite.id.clone(),
                    club_id,
                },
            ),
        );
        Ok(invite)
    }

    /// Accepts on behalf of the invited club. The caller needs the
    /// event-management permission in that club.
    pub async fn accept(&self, caller: UserId, invite_id: &Id) -> Result<Event, DomainError> {
        let invite = self.get_invite(invite_id).await?;
        self.require_club_manager(caller, invite.club.id).await?;

        if load_event(&self.ports, &invite.event_id).await?.status.is_closed() {
            return Err(DomainError::InvalidEventStatus);
        }

        let (deleted, updated) = tokio::join!(
            with_deadline(self.ports.invites.delete_club_invite(&invite.id)),
            self.add_invited_club(&invite),
        );
        deleted.map_err(|e| e.or_not_found(DomainError::InviteNotFound))?;
        let event = updated?;

        tracing::info!(
            event_id = %event.id,
            invite_id = %invite.id,
            club_id = invite.club.id,
            accepted_by = caller,
            "Club invite accepted"
        );
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id.clone(),
                caller,
                DomainEventKind::CollaboratorAdded {
                    club_id: invite.club.id,
                },
            ),
        );
        Ok(event)
    }

    pub async fn reject(&self, caller: UserId, invite_id: &Id) -> Result<(), DomainError> {
        let invite = self.get_invite(invite_id).await?;
        self.require_club_manager(caller, invite.club.id).await?;
        self.delete_invite(&invite).await?;
        tracing::info!(invite_id = %invite.id, rejected_by = caller, "Club invite rejected");
        Ok(())
    }

    /// Withdraws an invite. Owner only.
    pub async fn revoke(&self, caller: UserId, invite_id: &Id) -> Result<(), DomainError> {
        let invite = self.get_invite(invite_id).await?;
        let event = load_event(&self.ports, &invite.event_id).await?;
        require_owner(&event, caller)?;
        self.delete_invite(&invite).await?;
        tracing::info!(invite_id = %invite.id, revoked_by = caller, "Club invite revoked");
        Ok(())
    }

    /// Removes a collaborator club along with the organizers it supplied.
    pub async fn kick(
        &self,
        caller: UserId,
        event_id: &Id,
        club_id: ClubId,
    ) -> Result<Event, DomainError> {
        let mut event = load_event(&self.ports, event_id).await?;
        require_owner(&event, caller)?;

        let expected = event.updated_at;
        event.remove_collaborator(club_id)?;
        event.touch(Utc::now());
        save_event(&self.ports, &event, expected).await?;

        tracing::info!(event_id = %event.id, club_id = club_id, "Collaborator removed");
        emit(
            &self.ports.publisher,
            DomainEvent::new(
                event.id.clone(),
                caller,
                DomainEventKind::CollaboratorRemoved { club_id },
            ),
        );
        Ok(event)
    }

    async fn require_club_manager(&self, caller: UserId, club_id: ClubId) -> Result<(), DomainError> {
        let allowed = self
            .ports
            .directory
            .has_permission(caller, club_id, Permission::ManageEvents)
            .await?;
        if allowed {
            Ok(())
        } else {
            Err(DomainError::PermissionsDenied)
        }
    }

    async fn get_invite(&self, invite_id: &Id) -> Result<ClubInvite, DomainError> {
        with_deadline(self.ports.invites.get_club_invite(invite_id))
            .await
            .map_err(|e| e.or_not_found(DomainError::InviteNotFound))
    }

    async fn delete_invite(&self, invite: &ClubInvite) -> Result<(), DomainError> {
        with_deadline(self.ports.invites.delete_club_invite(&invite.id))
            .await
            .map_err(|e| e.or_not_found(DomainError::InviteNotFound))
    }

    async fn add_invited_club(&self, invite: &ClubInvite) -> Result<Event, DomainError> {
        let mut event = load_event(&self.ports, &invite.event_id).await?;
        if event.status.is_closed() {
            return Err(DomainError::InvalidEventStatus);
        }
        let expected = event.updated_at;
        event.add_collaborator(invite.club.clone())?;
        event.touch(Utc::now());
        save_event(&self.ports, &event, expected).await?;
        Ok(event)
    }
}
