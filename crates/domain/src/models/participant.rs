//! Participants and ban records of an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::MAX_REASON_LEN;
use shared::{Id, UserId};
use validator::Validate;

use super::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Id,
    pub event_id: Id,
    pub user: User,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(event_id: Id, user: User, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::generate(),
            event_id,
            user,
            joined_at: now,
        }
    }
}

/// A persistent block preventing a user from participating in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    pub event_id: Id,
    pub user: User,
    pub reason: String,
    pub banned_at: DateTime<Utc>,
    pub banned_by_user_id: UserId,
}

/// Request payload for banning a participant.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BanRequest {
    pub user_id: UserId,

    #[serde(default)]
    #[validate(length(max = MAX_REASON_LEN, message = "reason must be at most 1000 characters"))]
    pub reason: String,
}
