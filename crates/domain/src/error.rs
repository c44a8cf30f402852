//! Domain error taxonomy.
//!
//! Store and directory adapters report their own error types; services
//! translate them into [`DomainError`] at the service boundary.

use thiserror::Error;

/// Errors surfaced by domain services and the event aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("caller is not authenticated")]
    Unauthenticated,

    #[error("event not found")]
    EventNotFound,

    #[error("event was modified concurrently, retry the operation")]
    EventUpdateConflict,

    #[error("operation is not allowed in the current event status")]
    InvalidEventStatus,

    #[error("event is missing required fields: {}", .0.join(", "))]
    EventInvalidFields(Vec<String>),

    #[error("permission denied")]
    PermissionsDenied,

    #[error("user is the event owner")]
    UserIsEventOwner,

    #[error("club is the event owner")]
    ClubIsEventOwner,

    #[error("invite not found")]
    InviteNotFound,

    #[error("invite already exists")]
    InviteAlreadyExists,

    #[error("user is already an organizer")]
    UserAlreadyOrganizer,

    #[error("club is already a collaborator")]
    ClubAlreadyCollaborator,

    #[error("user is not a member of the club")]
    UserIsFromAnotherClub,

    #[error("organizer not found")]
    OrganizerNotFound,

    #[error("event has no organizers")]
    OrganizersEmpty,

    #[error("collaborator not found")]
    CollaboratorNotFound,

    #[error("club does not match")]
    ClubMismatch,

    #[error("event is full")]
    EventIsFull,

    #[error("user already participates in the event")]
    AlreadyParticipating,

    #[error("participant not found")]
    ParticipantNotFound,

    #[error("user is banned")]
    UserIsBanned,

    #[error("user is already banned")]
    UserAlreadyBanned,

    #[error("ban record not found")]
    BanRecordNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("club not found")]
    ClubNotFound,

    #[error("user does not exist locally")]
    UserNotExist,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure reported by a store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("optimistic locking failed")]
    OptimisticLockingFailed,

    #[error("store call timed out")]
    Timeout,

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Translates into a domain error, using `not_found` for missing records.
    pub fn or_not_found(self, not_found: DomainError) -> DomainError {
        match self {
            StoreError::NotFound => not_found,
            other => other.into(),
        }
    }

    /// Translates into a domain error, using `exists` for duplicate records.
    pub fn or_exists(self, exists: DomainError) -> DomainError {
        match self {
            StoreError::AlreadyExists => exists,
            other => other.into(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OptimisticLockingFailed => DomainError::EventUpdateConflict,
            StoreError::Timeout => DomainError::Internal("store deadline exceeded".into()),
            StoreError::NotFound => DomainError::Internal("record unexpectedly missing".into()),
            StoreError::AlreadyExists => DomainError::Internal("record unexpectedly exists".into()),
            StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}

/// Failure reported by a directory client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("not found")]
    NotFound,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for DomainError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound => DomainError::Internal("directory record not found".into()),
            DirectoryError::InvalidArgument(msg) => DomainError::InvalidArgument(msg),
            DirectoryError::Unavailable(msg) => DomainError::Internal(msg),
        }
    }
}

impl From<shared::IdError> for DomainError {
    fn from(err: shared::IdError) -> Self {
        DomainError::InvalidId(err.to_string())
    }
}

impl From<shared::pagination::PaginationError> for DomainError {
    fn from(err: shared::pagination::PaginationError) -> Self {
        DomainError::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_translation() {
        assert_eq!(
            DomainError::from(StoreError::OptimisticLockingFailed),
            DomainError::EventUpdateConflict
        );
        assert_eq!(
            StoreError::NotFound.or_not_found(DomainError::InviteNotFound),
            DomainError::InviteNotFound
        );
        assert_eq!(
            StoreError::AlreadyExists.or_exists(DomainError::AlreadyParticipating),
            DomainError::AlreadyParticipating
        );
        assert!(matches!(
            StoreError::Timeout.or_not_found(DomainError::EventNotFound),
            DomainError::Internal(_)
        ));
    }

    #[test]
    fn test_invalid_fields_message() {
        let err = DomainError::EventInvalidFields(vec!["title".into(), "type".into()]);
        assert_eq!(err.to_string(), "event is missing required fields: title, type");
    }

    #[test]
    fn test_directory_invalid_argument_is_preserved() {
        let err: DomainError = DirectoryError::InvalidArgument("bad id".into()).into();
        assert_eq!(err, DomainError::InvalidArgument("bad id".into()));
    }
}
