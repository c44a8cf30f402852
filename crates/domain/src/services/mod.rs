//! Domain services for the events service.
//!
//! Every read-modify-write path loads the aggregate, mutates a local copy
//! and persists it conditionally on the `updated_at` it was loaded with.
//! Nothing retries on conflict; the caller decides.

pub mod collaborator_invites;
pub mod event_management;
pub mod organizer_invites;
pub mod participation;
pub mod snapshots;

#[cfg(test)]
pub(crate) mod test_support;

pub use collaborator_invites::CollaboratorInviteService;
pub use event_management::{EventListQuery, EventService, ModerationPolicy};
pub use organizer_invites::OrganizerInviteService;
pub use participation::ParticipationService;
pub use snapshots::{SnapshotDirectory, SnapshotService};

use chrono::{DateTime, Utc};
use shared::{ClubId, Id, UserId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DirectoryError, DomainError, StoreError};
use crate::models::{Club, DomainEvent, Event, User};
use crate::ports::{DomainEventPublisher, Ports, StoreResult};

/// Upper bound on any single store call.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Actor id recorded for changes made by background jobs.
pub const SYSTEM_ACTOR: UserId = 0;

/// Bounds a store call by [`STORE_TIMEOUT`].
pub async fn with_deadline<T, F>(fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::time::timeout(STORE_TIMEOUT, fut)
        .await
        .unwrap_or(Err(StoreError::Timeout))
}

/// Publishes on a spawned task so the response never waits on the broker.
pub(crate) fn emit(publisher: &Arc<dyn DomainEventPublisher>, event: DomainEvent) {
    let publisher = Arc::clone(publisher);
    tokio::spawn(async move {
        if let Err(e) = publisher.publish(&event).await {
            tracing::warn!(
                event_id = %event.event_id,
                kind = event.kind.name(),
                error = %e,
                "Failed to publish domain event"
            );
        }
    });
}

pub(crate) async fn load_event(ports: &Ports, event_id: &Id) -> Result<Event, DomainError> {
    with_deadline(ports.events.get(event_id))
        .await
        .map_err(|e| e.or_not_found(DomainError::EventNotFound))
}

pub(crate) async fn save_event(
    ports: &Ports,
    event: &Event,
    expected: DateTime<Utc>,
) -> Result<(), DomainError> {
    with_deadline(ports.events.update(event, expected))
        .await
        .map_err(|e| e.or_not_found(DomainError::EventNotFound))
}

pub(crate) async fn fetch_user(ports: &Ports, user_id: UserId) -> Result<User, DomainError> {
    ports.directory.get_user(user_id).await.map_err(|e| match e {
        DirectoryError::NotFound => DomainError::UserNotFound,
        other => other.into(),
    })
}

pub(crate) async fn fetch_club(ports: &Ports, club_id: ClubId) -> Result<Club, DomainError> {
    ports.directory.get_club(club_id).await.map_err(|e| match e {
        DirectoryError::NotFound => DomainError::ClubNotFound,
        other => other.into(),
    })
}

pub(crate) fn require_owner(event: &Event, caller: UserId) -> Result<(), DomainError> {
    if event.is_owner(caller) {
        Ok(())
    } else {
        Err(DomainError::PermissionsDenied)
    }
}

pub(crate) fn require_organizer(event: &Event, caller: UserId) -> Result<(), DomainError> {
    if event.is_organizer(caller) {
        Ok(())
    } else {
        Err(DomainError::PermissionsDenied)
    }
}

/// Formats validator errors into a single client-facing message.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    if messages.is_empty() {
        messages.push(errors.to_string());
    }
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let result: StoreResult<()> = with_deadline(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
