//! Invite entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{Club, ClubInvite, OrganizerInvite, User};
use domain::StoreError;
use shared::Id;
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ClubInviteEntity {
    pub id: String,
    pub event_id: String,
    pub club: Json<Club>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ClubInviteEntity> for ClubInvite {
    type Error = StoreError;

    fn try_from(entity: ClubInviteEntity) -> Result<Self, Self::Error> {
        Ok(ClubInvite {
            id: parse_id(&entity.id)?,
            event_id: parse_id(&entity.event_id)?,
            club: entity.club.0,
            created_at: entity.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OrganizerInviteEntity {
    pub id: String,
    pub event_id: String,
    pub club_id: i64,
    pub invited_by_user_id: i64,
    pub target_user: Json<User>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrganizerInviteEntity> for OrganizerInvite {
    type Error = StoreError;

    fn try_from(entity: OrganizerInviteEntity) -> Result<Self, Self::Error> {
        Ok(OrganizerInvite {
            id: parse_id(&entity.id)?,
            event_id: parse_id(&entity.event_id)?,
            club_id: entity.club_id,
            invited_by_user_id: entity.invited_by_user_id,
            target_user: entity.target_user.0,
            created_at: entity.created_at,
        })
    }
}

/// Parses a stored identifier, reporting corrupt rows as backend errors.
pub(crate) fn parse_id(raw: &str) -> Result<Id, StoreError> {
    raw.parse()
        .map_err(|e: shared::IdError| StoreError::Backend(format!("corrupt id {}: {}", raw, e)))
}
