//! Outbound notifications emitted after a state change is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ClubId, Id, UserId};

use super::event::EventStatus;

/// What happened to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEventKind {
    Created,
    Updated,
    StatusChanged {
        from: EventStatus,
        to: EventStatus,
    },
    ClubInvited {
        invite_id: Id,
        club_id: ClubId,
    },
    CollaboratorAdded {
        club_id: ClubId,
    },
    CollaboratorRemoved {
        club_id: ClubId,
    },
    OrganizerInvited {
        invite_id: Id,
        user_id: UserId,
    },
    OrganizerAdded {
        user_id: UserId,
    },
    OrganizerRemoved {
        user_id: UserId,
    },
    ParticipantJoined {
        user_id: UserId,
    },
    ParticipantLeft {
        user_id: UserId,
    },
    ParticipantBanned {
        user_id: UserId,
    },
}

impl DomainEventKind {
    /// Short name used as the routing key suffix.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEventKind::Created => "created",
            DomainEventKind::Updated => "updated",
            DomainEventKind::StatusChanged { .. } => "status_changed",
            DomainEventKind::ClubInvited { .. } => "club_invited",
            DomainEventKind::CollaboratorAdded { .. } => "collaborator_added",
            DomainEventKind::CollaboratorRemoved { .. } => "collaborator_removed",
            DomainEventKind::OrganizerInvited { .. } => "organizer_invited",
            DomainEventKind::OrganizerAdded { .. } => "organizer_added",
            DomainEventKind::OrganizerRemoved { .. } => "organizer_removed",
            DomainEventKind::ParticipantJoined { .. } => "participant_joined",
            DomainEventKind::ParticipantLeft { .. } => "participant_left",
            DomainEventKind::ParticipantBanned { .. } => "participant_banned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Id,
    pub actor_user_id: UserId,
    #[serde(flatten)]
    pub kind: DomainEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_id: Id, actor_user_id: UserId, kind: DomainEventKind) -> Self {
        Self {
            event_id,
            actor_user_id,
            kind,
            occurred_at: Utc::now(),
        }
    }

    /// Routing key on the outbound exchange, e.g. `event.status_changed`.
    pub fn routing_key(&self) -> String {
        format!("event.{}", self.kind.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_key_and_encoding() {
        let event = DomainEvent::new(
            Id::generate(),
            10,
            DomainEventKind::StatusChanged {
                from: EventStatus::Draft,
                to: EventStatus::InProgress,
            },
        );
        assert_eq!(event.routing_key(), "event.status_changed");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "status_changed");
        assert_eq!(json["to"], "IN_PROGRESS");
        assert_eq!(json["actor_user_id"], 10);
    }
}
