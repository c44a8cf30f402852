//! Club collaboration endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::{ClubInvite, Event, InviteAction};
use serde::Deserialize;
use shared::ClubId;
use tracing::info;

use super::events::parse_id;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

#[derive(Debug, Deserialize)]
pub struct AddCollaboratorRequest {
    pub club_id: ClubId,
}

/// Answer to a pending invite, shared with the organizer endpoints.
#[derive(Debug, Deserialize)]
pub struct HandleInviteRequest {
    pub action: InviteAction,
}

/// Invite a club to co-host the event.
///
/// POST /api/v1/events/:event_id/collaborators
pub async fn add_collaborator(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    request: Result<Json<AddCollaboratorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClubInvite>), ApiError> {
    let Path(event_id) = path?;
    let Json(request) = request?;
    let invite = state
        .collaborators
        .create(caller.user_id, &parse_id(&event_id)?, request.club_id)
        .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

/// Remove a collaborating club along with its organizers.
///
/// DELETE /api/v1/events/:event_id/collaborators/:club_id
pub async fn remove_collaborator(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<(String, ClubId)>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path((event_id, club_id)) = path?;
    let event = state
        .collaborators
        .kick(caller.user_id, &parse_id(&event_id)?, club_id)
        .await?;
    Ok(Json(event))
}

/// Accept or reject a club invite.
///
/// POST /api/v1/club-invites/:invite_id
///
/// Accepting returns the updated event; rejecting returns 204.
pub async fn handle_club_invite(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    request: Result<Json<HandleInviteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(invite_id) = path?;
    let Json(request) = request?;
    let invite_id = parse_id(&invite_id)?;

    info!(invite_id = %invite_id, action = %request.action, "Handling club invite");
    match request.action {
        InviteAction::Accept => {
            let event = state.collaborators.accept(caller.user_id, &invite_id).await?;
            Ok(Json(event).into_response())
        }
        InviteAction::Reject => {
            state.collaborators.reject(caller.user_id, &invite_id).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// DELETE /api/v1/club-invites/:invite_id
pub async fn revoke_club_invite(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(invite_id) = path?;
    state
        .collaborators
        .revoke(caller.user_id, &parse_id(&invite_id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
