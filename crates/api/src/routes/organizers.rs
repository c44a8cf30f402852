//! Organizer invitation endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::{Event, InviteAction, OrganizerInvite};
use serde::Deserialize;
use shared::{ClubId, UserId};
use tracing::info;

use super::collaborators::HandleInviteRequest;
use super::events::parse_id;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

#[derive(Debug, Deserialize)]
pub struct AddOrganizerRequest {
    pub user_id: UserId,
    pub club_id: ClubId,
}

/// Invite a member of a hosting club to organize the event.
///
/// POST /api/v1/events/:event_id/organizers
pub async fn add_organizer(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    request: Result<Json<AddOrganizerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrganizerInvite>), ApiError> {
    let Path(event_id) = path?;
    let Json(request) = request?;
    let invite = state
        .organizers
        .create(
            caller.user_id,
            &parse_id(&event_id)?,
            request.user_id,
            request.club_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

/// DELETE /api/v1/events/:event_id/organizers/:user_id
pub async fn remove_organizer(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<(String, UserId)>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path((event_id, user_id)) = path?;
    let event = state
        .organizers
        .kick(caller.user_id, &parse_id(&event_id)?, user_id)
        .await?;
    Ok(Json(event))
}

/// Accept or reject an organizer invite addressed to the caller.
///
/// POST /api/v1/organizer-invites/:invite_id
pub async fn handle_organizer_invite(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    request: Result<Json<HandleInviteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(invite_id) = path?;
    let Json(request) = request?;
    let invite_id = parse_id(&invite_id)?;

    info!(invite_id = %invite_id, action = %request.action, "Handling organizer invite");
    match request.action {
        InviteAction::Accept => {
            let event = state.organizers.accept(caller.user_id, &invite_id).await?;
            Ok(Json(event).into_response())
        }
        InviteAction::Reject => {
            state.organizers.reject(caller.user_id, &invite_id).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// DELETE /api/v1/organizer-invites/:invite_id
pub async fn revoke_organizer_invite(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(invite_id) = path?;
    state
        .organizers
        .revoke(caller.user_id, &parse_id(&invite_id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
