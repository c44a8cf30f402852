//! Participant and ban record repository.

use domain::models::{BanRecord, Participant};
use domain::ports::{ParticipantStore, StoreResult};
use domain::StoreError;
use shared::pagination::Page;
use shared::{Id, UserId};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::entities::{BanRecordEntity, ParticipantEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for participant database operations.
#[derive(Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ParticipantStore for ParticipantRepository {
    async fn create(&self, participant: &Participant) -> StoreResult<()> {
        let timer = QueryTimer::new("create_participant");

        let result = sqlx::query(
            r#"
            INSERT INTO participants (id, event_id, user_id, "user", joined_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(participant.id.as_str())
        .bind(participant.event_id.as_str())
        .bind(participant.user.id)
        .bind(Json(&participant.user))
        .bind(participant.joined_at)
        .execute(&self.pool)
        .await;

        timer.record();
        result.map(|_| ()).map_err(store_error)
    }

    async fn get(&self, event_id: &Id, user_id: UserId) -> StoreResult<Participant> {
        let timer = QueryTimer::new("find_participant");

        let result = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            SELECT id, event_id, "user", joined_at
            FROM participants
            WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn delete(&self, event_id: &Id, user_id: UserId) -> StoreResult<()> {
        let timer = QueryTimer::new("delete_participant");

        let result = sqlx::query("DELETE FROM participants WHERE event_id = $1 AND user_id = $2")
            .bind(event_id.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await;

        timer.record();
        match result.map_err(store_error)?.rows_affected() {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    async fn list(&self, event_id: &Id, page: &Page) -> StoreResult<Vec<Participant>> {
        let timer = QueryTimer::new("list_participants");

        let result = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            SELECT id, event_id, "user", joined_at
            FROM participants
            WHERE event_id = $1
            ORDER BY joined_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(event_id.as_str())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .into_iter()
            .map(Participant::try_from)
            .collect()
    }

    async fn count(&self, event_id: &Id) -> StoreResult<i64> {
        let timer = QueryTimer::new("count_participants");

        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM participants WHERE event_id = $1",
        )
        .bind(event_id.as_str())
        .fetch_one(&self.pool)
        .await;

        timer.record();
        result.map_err(store_error)
    }

    async fn create_ban(&self, ban: &BanRecord) -> StoreResult<()> {
        let timer = QueryTimer::new("create_ban_record");

        let result = sqlx::query(
            r#"
            INSERT INTO ban_records (event_id, user_id, "user", reason, banned_at, banned_by_user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(ban.event_id.as_str())
        .bind(ban.user.id)
        .bind(Json(&ban.user))
        .bind(&ban.reason)
        .bind(ban.banned_at)
        .bind(ban.banned_by_user_id)
        .execute(&self.pool)
        .await;

        timer.record();
        result.map(|_| ()).map_err(store_error)
    }

    async fn get_ban(&self, event_id: &Id, user_id: UserId) -> StoreResult<Option<BanRecord>> {
        let timer = QueryTimer::new("find_ban_record");

        let result = sqlx::query_as::<_, BanRecordEntity>(
            r#"
            SELECT event_id, "user", reason, banned_at, banned_by_user_id
            FROM ban_records
            WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .map(BanRecord::try_from)
            .transpose()
    }

    async fn delete_ban(&self, event_id: &Id, user_id: UserId) -> StoreResult<()> {
        let timer = QueryTimer::new("delete_ban_record");

        let result = sqlx::query("DELETE FROM ban_records WHERE event_id = $1 AND user_id = $2")
            .bind(event_id.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await;

        timer.record();
        match result.map_err(store_error)?.rows_affected() {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }
}
