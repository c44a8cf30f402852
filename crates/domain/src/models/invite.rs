//! Pending invitations to collaborate on or organize an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ClubId, Id, UserId};
use std::fmt;

use super::user::{Club, User};

/// A proposal for a club to co-host an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubInvite {
    pub id: Id,
    pub event_id: Id,
    pub club: Club,
    pub created_at: DateTime<Utc>,
}

impl ClubInvite {
    pub fn new(event_id: Id, club: Club, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::generate(),
            event_id,
            club,
            created_at: now,
        }
    }
}

/// A proposal for a user to become an organizer of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerInvite {
    pub id: Id,
    pub event_id: Id,
    /// The club the invited user will represent.
    pub club_id: ClubId,
    pub invited_by_user_id: UserId,
    pub target_user: User,
    pub created_at: DateTime<Utc>,
}

impl OrganizerInvite {
    pub fn new(
        event_id: Id,
        club_id: ClubId,
        invited_by_user_id: UserId,
        target_user: User,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Id::generate(),
            event_id,
            club_id,
            invited_by_user_id,
            target_user,
            created_at: now,
        }
    }
}

/// Pending invites of one event, both kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInvites {
    pub club_invites: Vec<ClubInvite>,
    pub organizer_invites: Vec<OrganizerInvite>,
}

/// Answer to an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteAction {
    Accept,
    Reject,
}

impl fmt::Display for InviteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InviteAction::Accept => write!(f, "ACCEPT"),
            InviteAction::Reject => write!(f, "REJECT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_action_deserialization() {
        let action: InviteAction = serde_json::from_str("\"ACCEPT\"").unwrap();
        assert_eq!(action, InviteAction::Accept);
        assert!(serde_json::from_str::<InviteAction>("\"MAYBE\"").is_err());
    }

    #[test]
    fn test_new_invites_get_fresh_ids() {
        let event_id = Id::generate();
        let club = Club {
            id: 2,
            name: "Chess".into(),
            logo_url: None,
        };
        let a = ClubInvite::new(event_id.clone(), club.clone(), Utc::now());
        let b = ClubInvite::new(event_id, club, Utc::now());
        assert_ne!(a.id, b.id);
    }
}
