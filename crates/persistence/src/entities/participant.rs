//! Participant and ban record entities.

use chrono::{DateTime, Utc};
use domain::models::{BanRecord, Participant, User};
use domain::StoreError;
use sqlx::types::Json;
use sqlx::FromRow;

use super::invite::parse_id;

#[derive(Debug, Clone, FromRow)]
pub struct ParticipantEntity {
    pub id: String,
    pub event_id: String,
    pub user: Json<User>,
    pub joined_at: DateTime<Utc>,
}

impl TryFrom<ParticipantEntity> for Participant {
    type Error = StoreError;

    fn try_from(entity: ParticipantEntity) -> Result<Self, Self::Error> {
        Ok(Participant {
            id: parse_id(&entity.id)?,
            event_id: parse_id(&entity.event_id)?,
            user: entity.user.0,
            joined_at: entity.joined_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BanRecordEntity {
    pub event_id: String,
    pub user: Json<User>,
    pub reason: String,
    pub banned_at: DateTime<Utc>,
    pub banned_by_user_id: i64,
}

impl TryFrom<BanRecordEntity> for BanRecord {
    type Error = StoreError;

    fn try_from(entity: BanRecordEntity) -> Result<Self, Self::Error> {
        Ok(BanRecord {
            event_id: parse_id(&entity.event_id)?,
            user: entity.user.0,
            reason: entity.reason,
            banned_at: entity.banned_at,
            banned_by_user_id: entity.banned_by_user_id,
        })
    }
}
