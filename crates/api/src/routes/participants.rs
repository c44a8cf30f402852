//! Participation, kick and ban endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use domain::models::{BanRecord, BanRequest, Participant};
use serde::{Deserialize, Serialize};
use shared::pagination::{Page, PageInfo};
use shared::UserId;

use super::events::parse_id;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

#[derive(Debug, Default, Deserialize)]
pub struct ListParticipantsParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListParticipantsResponse {
    pub participants: Vec<Participant>,
    pub page_info: PageInfo,
}

/// Join the event as the caller.
///
/// POST /api/v1/events/:event_id/participation
pub async fn participate(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let Path(event_id) = path?;
    let participant = state
        .participation
        .participate(caller.user_id, &parse_id(&event_id)?)
        .await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// DELETE /api/v1/events/:event_id/participation
pub async fn cancel_participation(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(event_id) = path?;
    state
        .participation
        .cancel(caller.user_id, &parse_id(&event_id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/events/:event_id/participants
pub async fn list_participants(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    params: Result<Query<ListParticipantsParams>, QueryRejection>,
) -> Result<Json<ListParticipantsResponse>, ApiError> {
    let Path(event_id) = path?;
    let Query(params) = params?;
    let page = Page::new(params.page, params.page_size).map_err(domain::DomainError::from)?;

    let (participants, page_info) = state
        .participation
        .list(caller.user_id, &parse_id(&event_id)?, page)
        .await?;
    Ok(Json(ListParticipantsResponse {
        participants,
        page_info,
    }))
}

/// DELETE /api/v1/events/:event_id/participants/:user_id
pub async fn kick_participant(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<(String, UserId)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((event_id, user_id)) = path?;
    state
        .participation
        .kick(caller.user_id, &parse_id(&event_id)?, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ban a user; drops their participation if any.
///
/// POST /api/v1/events/:event_id/bans
pub async fn ban_participant(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    request: Result<Json<BanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BanRecord>), ApiError> {
    let Path(event_id) = path?;
    let Json(request) = request?;
    let ban = state
        .participation
        .ban(caller.user_id, &parse_id(&event_id)?, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ban)))
}

/// DELETE /api/v1/events/:event_id/bans/:user_id
pub async fn unban_participant(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<(String, UserId)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((event_id, user_id)) = path?;
    state
        .participation
        .unban(caller.user_id, &parse_id(&event_id)?, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
