//! Invite repository for club collaboration and organizer invites.

use domain::models::{ClubInvite, OrganizerInvite};
use domain::ports::{InviteStore, StoreResult};
use domain::StoreError;
use shared::{ClubId, Id, UserId};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::entities::{ClubInviteEntity, OrganizerInviteEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for invite database operations.
#[derive(Clone)]
pub struct InviteRepository {
    pool: PgPool,
}

impl InviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_by_id(&self, table: &'static str, id: &Id) -> StoreResult<()> {
        let timer = QueryTimer::new(format!("delete_{}", table));

        let query = format!("DELETE FROM {} WHERE id = $1", table);
        let result = sqlx::query(&query)
            .bind(id.as_str())
            .execute(&self.pool)
            .await;

        timer.record();
        match result.map_err(store_error)?.rows_affected() {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl InviteStore for InviteRepository {
    async fn create_club_invite(&self, invite: &ClubInvite) -> StoreResult<()> {
        let timer = QueryTimer::new("create_club_invite");

        let result = sqlx::query(
            r#"
            INSERT INTO club_invites (id, event_id, club_id, club, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(invite.id.as_str())
        .bind(invite.event_id.as_str())
        .bind(invite.club.id)
        .bind(Json(&invite.club))
        .bind(invite.created_at)
        .execute(&self.pool)
        .await;

        timer.record();
        result.map(|_| ()).map_err(store_error)
    }

    async fn get_club_invite(&self, id: &Id) -> StoreResult<ClubInvite> {
        let timer = QueryTimer::new("find_club_invite_by_id");

        let result = sqlx::query_as::<_, ClubInviteEntity>(
            "SELECT id, event_id, club, created_at FROM club_invites WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn find_club_invite(
        &self,
        event_id: &Id,
        club_id: ClubId,
    ) -> StoreResult<Option<ClubInvite>> {
        let timer = QueryTimer::new("find_club_invite_by_event_club");

        let result = sqlx::query_as::<_, ClubInviteEntity>(
            r#"
            SELECT id, event_id, club, created_at
            FROM club_invites
            WHERE event_id = $1 AND club_id = $2
            "#,
        )
        .bind(event_id.as_str())
        .bind(club_id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .map(ClubInvite::try_from)
            .transpose()
    }

    async fn delete_club_invite(&self, id: &Id) -> StoreResult<()> {
        self.delete_by_id("club_invites", id).await
    }

    async fn list_club_invites(&self, event_id: &Id) -> StoreResult<Vec<ClubInvite>> {
        let timer = QueryTimer::new("list_club_invites");

        let result = sqlx::query_as::<_, ClubInviteEntity>(
            r#"
            SELECT id, event_id, club, created_at
            FROM club_invites
            WHERE event_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(event_id.as_str())
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .into_iter()
            .map(ClubInvite::try_from)
            .collect()
    }

    async fn create_organizer_invite(&self, invite: &OrganizerInvite) -> StoreResult<()> {
        let timer = QueryTimer::new("create_organizer_invite");

        let result = sqlx::query(
            r#"
            INSERT INTO organizer_invites (
                id, event_id, club_id, invited_by_user_id, target_user_id, target_user, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(invite.id.as_str())
        .bind(invite.event_id.as_str())
        .bind(invite.club_id)
        .bind(invite.invited_by_user_id)
        .bind(invite.target_user.id)
        .bind(Json(&invite.target_user))
        .bind(invite.created_at)
        .execute(&self.pool)
        .await;

        timer.record();
        result.map(|_| ()).map_err(store_error)
    }

    async fn get_organizer_invite(&self, id: &Id) -> StoreResult<OrganizerInvite> {
        let timer = QueryTimer::new("find_organizer_invite_by_id");

        let result = sqlx::query_as::<_, OrganizerInviteEntity>(
            r#"
            SELECT id, event_id, club_id, invited_by_user_id, target_user, created_at
            FROM organizer_invites
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn find_organizer_invite(
        &self,
        event_id: &Id,
        user_id: UserId,
    ) -> StoreResult<Option<OrganizerInvite>> {
        let timer = QueryTimer::new("find_organizer_invite_by_event_user");

        let result = sqlx::query_as::<_, OrganizerInviteEntity>(
            r#"
            SELECT id, event_id, club_id, invited_by_user_id, target_user, created_at
            FROM organizer_invites
            WHERE event_id = $1 AND target_user_id = $2
            "#,
        )
        .bind(event_id.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .map(OrganizerInvite::try_from)
            .transpose()
    }

    async fn delete_organizer_invite(&self, id: &Id) -> StoreResult<()> {
        self.delete_by_id("organizer_invites", id).await
    }

    async fn list_organizer_invites(&self, event_id: &Id) -> StoreResult<Vec<OrganizerInvite>> {
        let timer = QueryTimer::new("list_organizer_invites");

        let result = sqlx::query_as::<_, OrganizerInviteEntity>(
            r#"
            SELECT id, event_id, club_id, invited_by_user_id, target_user, created_at
            FROM organizer_invites
            WHERE event_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(event_id.as_str())
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
            .map_err(store_error)?
            .into_iter()
            .map(OrganizerInvite::try_from)
            .collect()
    }

    async fn delete_by_event(&self, event_id: &Id) -> StoreResult<u64> {
        let timer = QueryTimer::new("delete_invites_by_event");

        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let clubs = sqlx::query("DELETE FROM club_invites WHERE event_id = $1")
            .bind(event_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        let organizers = sqlx::query("DELETE FROM organizer_invites WHERE event_id = $1")
            .bind(event_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;

        timer.record();
        Ok(clubs.rows_affected() + organizers.rows_affected())
    }
}
