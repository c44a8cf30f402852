use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by HTTP handlers.
///
/// Each variant corresponds to one RPC status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
            ApiError::Aborted(_) => (StatusCode::CONFLICT, "aborted"),
            ApiError::FailedPrecondition(_) => {
                (StatusCode::PRECONDITION_FAILED, "failed_precondition")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let message = match self {
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            ApiError::InvalidArgument(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::PermissionDenied(msg)
            | ApiError::NotFound(msg)
            | ApiError::AlreadyExists(msg)
            | ApiError::Aborted(msg)
            | ApiError::FailedPrecondition(msg) => msg,
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::InvalidArgument(_) | DomainError::InvalidId(_) => {
                ApiError::InvalidArgument(message)
            }
            DomainError::Unauthenticated => ApiError::Unauthenticated(message),
            DomainError::PermissionsDenied
            | DomainError::UserIsEventOwner
            | DomainError::ClubIsEventOwner => ApiError::PermissionDenied(message),
            DomainError::EventNotFound
            | DomainError::InviteNotFound
            | DomainError::OrganizerNotFound
            | DomainError::CollaboratorNotFound
            | DomainError::ParticipantNotFound
            | DomainError::BanRecordNotFound
            | DomainError::UserNotFound
            | DomainError::ClubNotFound
            | DomainError::UserNotExist => ApiError::NotFound(message),
            DomainError::InviteAlreadyExists
            | DomainError::UserAlreadyOrganizer
            | DomainError::ClubAlreadyCollaborator
            | DomainError::AlreadyParticipating
            | DomainError::UserAlreadyBanned => ApiError::AlreadyExists(message),
            DomainError::EventUpdateConflict => ApiError::Aborted(message),
            DomainError::InvalidEventStatus
            | DomainError::EventInvalidFields(_)
            | DomainError::UserIsFromAnotherClub
            | DomainError::OrganizersEmpty
            | DomainError::ClubMismatch
            | DomainError::EventIsFull
            | DomainError::UserIsBanned => ApiError::FailedPrecondition(message),
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::InvalidArgument(domain::services::validation_message(&errors))
    }
}

impl From<shared::IdError> for ApiError {
    fn from(err: shared::IdError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}
