//! User and club snapshot repository.

use domain::models::{Club, User};
use domain::ports::{SnapshotStore, StoreResult};
use domain::StoreError;
use shared::{ClubId, UserId};
use sqlx::PgPool;

use crate::entities::{ClubSnapshotEntity, UserSnapshotEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for the local users and clubs tables.
#[derive(Clone)]
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SnapshotStore for SnapshotRepository {
    async fn upsert_user(&self, user: &User) -> StoreResult<()> {
        let timer = QueryTimer::new("upsert_user_snapshot");

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, avatar, barcode, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                avatar = EXCLUDED.avatar,
                barcode = EXCLUDED.barcode,
                updated_at = NOW()
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar)
        .bind(&user.barcode)
        .execute(&self.pool)
        .await;

        timer.record();
        result.map(|_| ()).map_err(store_error)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let timer = QueryTimer::new("update_user_snapshot");

        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, avatar = $4, barcode = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar)
        .bind(&user.barcode)
        .execute(&self.pool)
        .await;

        timer.record();
        match result.map_err(store_error)?.rows_affected() {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let timer = QueryTimer::new("find_user_snapshot");

        let result = sqlx::query_as::<_, UserSnapshotEntity>(
            "SELECT id, first_name, last_name, avatar, barcode FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        Ok(result.map_err(store_error)?.map(User::from))
    }

    async fn get_club(&self, club_id: ClubId) -> StoreResult<Option<Club>> {
        let timer = QueryTimer::new("find_club_snapshot");

        let result = sqlx::query_as::<_, ClubSnapshotEntity>(
            "SELECT id, name, logo_url FROM clubs WHERE id = $1",
        )
        .bind(club_id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        Ok(result.map_err(store_error)?.map(Club::from))
    }

    async fn upsert_club(&self, club: &Club) -> StoreResult<()> {
        let timer = QueryTimer::new("upsert_club_snapshot");

        let result = sqlx::query(
            r#"
            INSERT INTO clubs (id, name, logo_url, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                logo_url = EXCLUDED.logo_url,
                updated_at = NOW()
            "#,
        )
        .bind(club.id)
        .bind(&club.name)
        .bind(&club.logo_url)
        .execute(&self.pool)
        .await;

        timer.record();
        result.map(|_| ()).map_err(store_error)
    }
}
