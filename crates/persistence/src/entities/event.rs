//! Event entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{
    ApproveMetadata, Club, CoverImage, Event, EventStatus, EventType, File, Organizer,
    RejectMetadata,
};
use domain::StoreError;
use sqlx::types::Json;
use sqlx::FromRow;

/// Column list shared by every event query.
pub const EVENT_COLUMNS: &str = r#"
    id, owner_user_id, owner_club_id, title, description, event_type, tags,
    cover_images, attached_images, attached_files, start_date, end_date,
    location_link, location_university, collaborator_clubs, organizers,
    max_participants, participants_count, status, approve_metadata,
    reject_metadata, created_at, updated_at, deleted_at
"#;

/// Database row mapping for the events table.
///
/// Embedded records live in JSONB columns. `collaborator_club_ids` and
/// `organizer_user_ids` are written alongside for filtering and are not read
/// back.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: String,
    pub owner_user_id: i64,
    pub owner_club_id: i64,
    pub title: String,
    pub description: String,
    pub event_type: Option<String>,
    pub tags: Vec<String>,
    pub cover_images: Json<Vec<CoverImage>>,
    pub attached_images: Json<Vec<File>>,
    pub attached_files: Json<Vec<File>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location_link: String,
    pub location_university: String,
    pub collaborator_clubs: Json<Vec<Club>>,
    pub organizers: Json<Vec<Organizer>>,
    pub max_participants: i32,
    pub participants_count: i32,
    pub status: String,
    pub approve_metadata: Option<Json<ApproveMetadata>>,
    pub reject_metadata: Option<Json<RejectMetadata>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventEntity> for Event {
    type Error = StoreError;

    fn try_from(entity: EventEntity) -> Result<Self, Self::Error> {
        let status = entity
            .status
            .parse::<EventStatus>()
            .map_err(StoreError::Backend)?;
        let event_type = entity
            .event_type
            .as_deref()
            .map(str::parse::<EventType>)
            .transpose()
            .map_err(StoreError::Backend)?;
        let id = entity
            .id
            .parse()
            .map_err(|e: shared::IdError| StoreError::Backend(e.to_string()))?;

        Ok(Event {
            id,
            owner_user_id: entity.owner_user_id,
            owner_club_id: entity.owner_club_id,
            title: entity.title,
            description: entity.description,
            event_type,
            tags: entity.tags,
            cover_images: entity.cover_images.0,
            attached_images: entity.attached_images.0,
            attached_files: entity.attached_files.0,
            start_date: entity.start_date,
            end_date: entity.end_date,
            location_link: entity.location_link,
            location_university: entity.location_university,
            collaborator_clubs: entity.collaborator_clubs.0,
            organizers: entity.organizers.0,
            max_participants: entity.max_participants,
            participants_count: entity.participants_count,
            status,
            approve_metadata: entity.approve_metadata.map(|m| m.0),
            reject_metadata: entity.reject_metadata.map(|m| m.0),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            deleted_at: entity.deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::User;
    use shared::Id;

    fn entity() -> EventEntity {
        let now = Utc::now();
        let owner = User {
            id: 10,
            first_name: "A".into(),
            last_name: "B".into(),
            avatar: None,
            barcode: String::new(),
        };
        EventEntity {
            id: Id::generate().to_string(),
            owner_user_id: 10,
            owner_club_id: 1,
            title: "Robotics night".into(),
            description: String::new(),
            event_type: Some("UNIVERSITY".into()),
            tags: vec!["ai".into()],
            cover_images: Json(vec![]),
            attached_images: Json(vec![]),
            attached_files: Json(vec![]),
            start_date: None,
            end_date: None,
            location_link: String::new(),
            location_university: String::new(),
            collaborator_clubs: Json(vec![]),
            organizers: Json(vec![Organizer {
                user: owner,
                club_id: 1,
                invited_by_user_id: 10,
            }]),
            max_participants: 0,
            participants_count: 0,
            status: "IN_PROGRESS".into(),
            approve_metadata: None,
            reject_metadata: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let event = Event::try_from(entity()).unwrap();
        assert_eq!(event.status, EventStatus::InProgress);
        assert_eq!(event.event_type, Some(EventType::University));
        assert!(event.is_organizer(10));
    }

    #[test]
    fn test_unknown_status_is_backend_error() {
        let mut row = entity();
        row.status = "LIMBO".into();
        assert!(matches!(Event::try_from(row), Err(StoreError::Backend(_))));
    }
}
