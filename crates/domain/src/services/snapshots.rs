//! Local user and club snapshots.

use shared::{ClubId, UserId};
use std::sync::Arc;

use super::with_deadline;
use crate::error::{DirectoryError, DomainError};
use crate::models::{Club, Permission, User};
use crate::ports::{Directory, DirectoryResult, SnapshotStore};

/// Applies upstream change notifications to the snapshot tables.
#[derive(Clone)]
pub struct SnapshotService {
    snapshots: Arc<dyn SnapshotStore>,
}

impl SnapshotService {
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { snapshots }
    }

    /// Refreshes a known user. Users never seen locally yield `UserNotExist`.
    pub async fn apply_user_update(&self, user: &User) -> Result<(), DomainError> {
        with_deadline(self.snapshots.update_user(user))
            .await
            .map_err(|e| e.or_not_found(DomainError::UserNotExist))?;
        tracing::debug!(user_id = user.id, "User snapshot updated");
        Ok(())
    }

    pub async fn apply_club_update(&self, club: &Club) -> Result<(), DomainError> {
        with_deadline(self.snapshots.upsert_club(club)).await?;
        tracing::debug!(club_id = club.id, "Club snapshot updated");
        Ok(())
    }
}

/// Directory decorator writing every fetched user and club through to the
/// snapshot store. Write failures are logged and do not fail the lookup.
///
/// While the upstream directory is unavailable, users and clubs are served
/// from their last snapshot. Upstream `NotFound` is final.
pub struct SnapshotDirectory {
    inner: Arc<dyn Directory>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl SnapshotDirectory {
    pub fn new(inner: Arc<dyn Directory>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { inner, snapshots }
    }
}

#[async_trait::async_trait]
impl Directory for SnapshotDirectory {
    async fn get_user(&self, user_id: UserId) -> DirectoryResult<User> {
        let user = match self.inner.get_user(user_id).await {
            Ok(user) => user,
            Err(DirectoryError::Unavailable(reason)) => {
                return match with_deadline(self.snapshots.get_user(user_id)).await {
                    Ok(Some(user)) => {
                        tracing::debug!(user_id = user_id, reason = %reason, "Serving user snapshot");
                        Ok(user)
                    }
                    _ => Err(DirectoryError::Unavailable(reason)),
                };
            }
            Err(e) => return Err(e),
        };
        if let Err(e) = with_deadline(self.snapshots.upsert_user(&user)).await {
            tracing::warn!(user_id = user_id, error = %e, "Failed to store user snapshot");
        }
        Ok(user)
    }

    async fn get_club(&self, club_id: ClubId) -> DirectoryResult<Club> {
        let club = match self.inner.get_club(club_id).await {
            Ok(club) => club,
            Err(DirectoryError::Unavailable(reason)) => {
                return match with_deadline(self.snapshots.get_club(club_id)).await {
                    Ok(Some(club)) => {
                        tracing::debug!(club_id = club_id, reason = %reason, "Serving club snapshot");
                        Ok(club)
                    }
                    _ => Err(DirectoryError::Unavailable(reason)),
                };
            }
            Err(e) => return Err(e),
        };
        if let Err(e) = with_deadline(self.snapshots.upsert_club(&club)).await {
            tracing::warn!(club_id = club_id, error = %e, "Failed to store club snapshot");
        }
        Ok(club)
    }

    async fn is_club_member(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool> {
        self.inner.is_club_member(user_id, club_id).await
    }

    async fn is_banned_in_club(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool> {
        self.inner.is_banned_in_club(user_id, club_id).await
    }

    async fn has_permission(
        &self,
        user_id: UserId,
        club_id: ClubId,
        permission: Permission,
    ) -> DirectoryResult<bool> {
        self.inner.has_permission(user_id, club_id, permission).await
    }
}
