//! Event repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::{Event, EventFilter, EventOrder, SortBy, SortOrder};
use domain::ports::{EventStore, StoreResult};
use domain::StoreError;
use shared::pagination::Page;
use shared::Id;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::entities::{EventEntity, EVENT_COLUMNS};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Builds the WHERE clause for an [`EventFilter`].
///
/// Tracks parameter positions so that [`bind_event_filters!`] can bind the
/// values in the same order.
struct EventFilterBuilder {
    conditions: Vec<String>,
    param_count: i32,
}

impl EventFilterBuilder {
    fn build(filter: &EventFilter) -> Self {
        let mut conditions = vec!["deleted_at IS NULL".to_string()];
        let mut param_count = 0;

        if filter.club_id.is_some() {
            param_count += 1;
            conditions.push(format!(
                "(owner_club_id = ${0} OR ${0} = ANY(collaborator_club_ids))",
                param_count
            ));
        }

        if filter.owner_user_id.is_some() {
            param_count += 1;
            conditions.push(format!("owner_user_id = ${}", param_count));
        }

        if filter.organizer_user_id.is_some() {
            param_count += 1;
            conditions.push(format!("${} = ANY(organizer_user_ids)", param_count));
        }

        if !filter.tags.is_empty() {
            param_count += 1;
            conditions.push(format!("tags && ${}", param_count));
        }

        if filter.starts_after.is_some() {
            param_count += 1;
            conditions.push(format!("start_date >= ${}", param_count));
        }

        if filter.starts_before.is_some() {
            param_count += 1;
            conditions.push(format!("start_date <= ${}", param_count));
        }

        if filter.ends_before.is_some() {
            param_count += 1;
            conditions.push(format!("end_date <= ${}", param_count));
        }

        if !filter.statuses.is_empty() {
            param_count += 1;
            conditions.push(format!("status = ANY(${})", param_count));
        }

        if filter.hide_private {
            param_count += 1;
            conditions.push(format!(
                "(event_type = 'UNIVERSITY' OR owner_club_id = ANY(${0}) OR collaborator_club_ids && ${0})",
                param_count
            ));
        }

        Self {
            conditions,
            param_count,
        }
    }

    fn where_clause(&self) -> String {
        self.conditions.join(" AND ")
    }

    fn param_count(&self) -> i32 {
        self.param_count
    }
}

/// Binds the filter values in the order [`EventFilterBuilder`] numbered them.
macro_rules! bind_event_filters {
    ($builder:expr, $filter:expr) => {{
        let mut b = $builder;
        if let Some(club_id) = $filter.club_id {
            b = b.bind(club_id);
        }
        if let Some(owner_user_id) = $filter.owner_user_id {
            b = b.bind(owner_user_id);
        }
        if let Some(organizer_user_id) = $filter.organizer_user_id {
            b = b.bind(organizer_user_id);
        }
        if !$filter.tags.is_empty() {
            b = b.bind($filter.tags.clone());
        }
        if let Some(starts_after) = $filter.starts_after {
            b = b.bind(starts_after);
        }
        if let Some(starts_before) = $filter.starts_before {
            b = b.bind(starts_before);
        }
        if let Some(ends_before) = $filter.ends_before {
            b = b.bind(ends_before);
        }
        if !$filter.statuses.is_empty() {
            b = b.bind(
                $filter
                    .statuses
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect::<Vec<String>>(),
            );
        }
        if $filter.hide_private {
            b = b.bind($filter.visible_club_ids.clone());
        }
        b
    }};
}

/// ORDER BY clause matching [`EventOrder::compare`]: absent values sort
/// first ascending and last descending, ties break on id.
fn order_clause(order: EventOrder) -> String {
    let column = match order.sort_by {
        SortBy::Date => "start_date",
        SortBy::Participants => "participants_count",
        SortBy::Type => "event_type",
    };
    let direction = match order.sort_order {
        SortOrder::Asc => "ASC NULLS FIRST",
        SortOrder::Desc => "DESC NULLS LAST",
    };
    format!("{} {}, id ASC", column, direction)
}

/// Repository for event database operations.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes every mutable column, guarded by the previous `updated_at`.
    async fn write(
        &self,
        event: &Event,
        expected: DateTime<Utc>,
        query_name: &'static str,
    ) -> StoreResult<()> {
        let timer = QueryTimer::new(query_name);

        let result = sqlx::query(
            r#"
            UPDATE events SET
                title = $2, description = $3, event_type = $4, tags = $5,
                cover_images = $6, attached_images = $7, attached_files = $8,
                start_date = $9, end_date = $10, location_link = $11,
                location_university = $12, collaborator_clubs = $13,
                collaborator_club_ids = $14, organizers = $15, organizer_user_ids = $16,
                max_participants = $17, participants_count = $18, status = $19,
                approve_metadata = $20, reject_metadata = $21, updated_at = $22,
                deleted_at = $23
            WHERE id = $1 AND updated_at = $24 AND deleted_at IS NULL
            "#,
        )
        .bind(event.id.as_str())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_type.map(|t| t.as_str()))
        .bind(&event.tags)
        .bind(Json(&event.cover_images))
        .bind(Json(&event.attached_images))
        .bind(Json(&event.attached_files))
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location_link)
        .bind(&event.location_university)
        .bind(Json(&event.collaborator_clubs))
        .bind(collaborator_ids(event))
        .bind(Json(&event.organizers))
        .bind(organizer_ids(event))
        .bind(event.max_participants)
        .bind(event.participants_count)
        .bind(event.status.as_str())
        .bind(event.approve_metadata.as_ref().map(Json))
        .bind(event.reject_metadata.as_ref().map(Json))
        .bind(event.updated_at)
        .bind(event.deleted_at)
        .bind(expected)
        .execute(&self.pool)
        .await;

        timer.record();
        if result.map_err(store_error)?.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing matched: either the row is gone or someone else won the race.
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM events WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(event.id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        if exists {
            tracing::debug!(event_id = %event.id, "Optimistic lock lost");
            Err(StoreError::OptimisticLockingFailed)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

fn collaborator_ids(event: &Event) -> Vec<i64> {
    event.collaborator_clubs.iter().map(|c| c.id).collect()
}

fn organizer_ids(event: &Event) -> Vec<i64> {
    event.organizers.iter().map(|o| o.user.id).collect()
}

#[async_trait::async_trait]
impl EventStore for EventRepository {
    async fn create(&self, event: &Event) -> StoreResult<()> {
        let timer = QueryTimer::new("create_event");

        let result = sqlx::query(
            r#"
            INSERT INTO events (
                id, owner_user_id, owner_club_id, title, description, event_type, tags,
                cover_images, attached_images, attached_files, start_date, end_date,
                location_link, location_university, collaborator_clubs,
                collaborator_club_ids, organizers, organizer_user_ids,
                max_participants, participants_count, status, approve_metadata,
                reject_metadata, created_at, updated_at, deleted_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
            )
            "#,
        )
        .bind(event.id.as_str())
        .bind(event.owner_user_id)
        .bind(event.owner_club_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_type.map(|t| t.as_str()))
        .bind(&event.tags)
        .bind(Json(&event.cover_images))
        .bind(Json(&event.attached_images))
        .bind(Json(&event.attached_files))
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location_link)
        .bind(&event.location_university)
        .bind(Json(&event.collaborator_clubs))
        .bind(collaborator_ids(event))
        .bind(Json(&event.organizers))
        .bind(organizer_ids(event))
        .bind(event.max_participants)
        .bind(event.participants_count)
        .bind(event.status.as_str())
        .bind(event.approve_metadata.as_ref().map(Json))
        .bind(event.reject_metadata.as_ref().map(Json))
        .bind(event.created_at)
        .bind(event.updated_at)
        .bind(event.deleted_at)
        .execute(&self.pool)
        .await;

        timer.record();
        result.map(|_| ()).map_err(store_error)
    }

    async fn get(&self, id: &Id) -> StoreResult<Event> {
        let timer = QueryTimer::new("find_event_by_id");

        let query = format!(
            "SELECT {} FROM events WHERE id = $1 AND deleted_at IS NULL",
            EVENT_COLUMNS
        );
        let result = sqlx::query_as::<_, EventEntity>(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn update(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()> {
        self.write(event, expected, "update_event").await
    }

    async fn soft_delete(&self, event: &Event, expected: DateTime<Utc>) -> StoreResult<()> {
        if event.deleted_at.is_none() {
            return Err(StoreError::Backend(
                "soft delete of an event without deleted_at".into(),
            ));
        }
        self.write(event, expected, "soft_delete_event").await
    }

    async fn list(
        &self,
        filter: &EventFilter,
        order: EventOrder,
        page: &Page,
    ) -> StoreResult<Vec<Event>> {
        let timer = QueryTimer::new("list_events");

        let builder = EventFilterBuilder::build(filter);
        let query = format!(
            "SELECT {} FROM events WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            EVENT_COLUMNS,
            builder.where_clause(),
            order_clause(order),
            builder.param_count() + 1,
            builder.param_count() + 2
        );

        let result = bind_event_filters!(sqlx::query_as::<_, EventEntity>(&query), filter)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;

        timer.record();
        result
            .map_err(store_error)?
            .into_iter()
            .map(Event::try_from)
            .collect()
    }

    async fn count(&self, filter: &EventFilter) -> StoreResult<i64> {
        let timer = QueryTimer::new("count_events");

        let builder = EventFilterBuilder::build(filter);
        let query = format!(
            "SELECT COUNT(*) FROM events WHERE {}",
            builder.where_clause()
        );

        let result = bind_event_filters!(sqlx::query_scalar::<_, i64>(&query), filter)
            .fetch_one(&self.pool)
            .await;

        timer.record();
        result.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::EventStatus;

    #[test]
    fn test_empty_filter_only_hides_deleted() {
        let builder = EventFilterBuilder::build(&EventFilter::default());
        assert_eq!(builder.where_clause(), "deleted_at IS NULL");
        assert_eq!(builder.param_count(), 0);
    }

    #[test]
    fn test_filter_numbers_parameters_in_bind_order() {
        let filter = EventFilter {
            club_id: Some(1),
            tags: vec!["ai".into()],
            statuses: vec![EventStatus::InProgress],
            hide_private: true,
            visible_club_ids: vec![1, 2],
            ..Default::default()
        };
        let builder = EventFilterBuilder::build(&filter);
        assert_eq!(builder.param_count(), 4);
        let clause = builder.where_clause();
        assert!(clause.contains("(owner_club_id = $1 OR $1 = ANY(collaborator_club_ids))"));
        assert!(clause.contains("tags && $2"));
        assert!(clause.contains("status = ANY($3)"));
        assert!(clause.contains("collaborator_club_ids && $4"));
    }

    #[test]
    fn test_order_clause() {
        assert_eq!(
            order_clause(EventOrder::default()),
            "start_date ASC NULLS FIRST, id ASC"
        );
        assert_eq!(
            order_clause(EventOrder {
                sort_by: SortBy::Participants,
                sort_order: SortOrder::Desc,
            }),
            "participants_count DESC NULLS LAST, id ASC"
        );
    }
}
