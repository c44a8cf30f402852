//! Event endpoint handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::{Event, EventInvites, EventOrder, EventPatch, EventStatus};
use domain::services::EventListQuery;
use serde::{Deserialize, Serialize};
use shared::pagination::{Page, PageInfo};
use shared::{ClubId, Id, UserId};
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub club_id: ClubId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub event: EventPatch,
    #[serde(default)]
    pub update_mask: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectEventRequest {
    #[serde(default)]
    pub reason: String,
}

/// Query parameters of `GET /api/v1/events`.
///
/// `tags` and `statuses` are comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub club_id: Option<ClubId>,
    pub owner_id: Option<UserId>,
    pub tags: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub statuses: Option<String>,
    #[serde(default)]
    pub hide_private: bool,
}

impl ListEventsParams {
    fn into_query(self) -> Result<EventListQuery, ApiError> {
        let statuses = split_list(self.statuses.as_deref())
            .into_iter()
            .map(|s| s.parse::<EventStatus>().map_err(ApiError::InvalidArgument))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EventListQuery {
            club_id: self.club_id,
            owner_user_id: self.owner_id,
            tags: split_list(self.tags.as_deref()),
            starts_after: self.from,
            ends_before: self.to,
            statuses,
            hide_private: self.hide_private,
            order: EventOrder::from_params(self.sort_by.as_deref(), self.sort_order.as_deref())?,
            page: Page::new(self.page, self.page_size).map_err(domain::DomainError::from)?,
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    pub events: Vec<Event>,
    pub page_info: PageInfo,
}

/// Parses a path segment into an aggregate id.
pub(crate) fn parse_id(raw: &str) -> Result<Id, ApiError> {
    Ok(raw.parse::<Id>()?)
}

/// Create a draft event.
///
/// POST /api/v1/events
pub async fn create_event(
    State(state): State<AppState>,
    caller: Caller,
    request: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let Json(request) = request?;
    let event = state.events.create(caller.user_id, request.club_id).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/v1/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state.events.get(caller.user_id, &parse_id(&event_id)?).await?;
    Ok(Json(event))
}

/// List events visible to the caller.
///
/// GET /api/v1/events
pub async fn list_events(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Query<ListEventsParams>, QueryRejection>,
) -> Result<Json<ListEventsResponse>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    debug!(caller = caller.user_id, ?query, "Listing events");

    let (events, page_info) = state.events.list(caller.user_id, query).await?;
    Ok(Json(ListEventsResponse { events, page_info }))
}

/// Apply the fields named in `update_mask`.
///
/// PATCH /api/v1/events/:event_id
pub async fn update_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    request: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let Json(request) = request?;
    let event = state
        .events
        .update(
            caller.user_id,
            &parse_id(&event_id)?,
            request.event,
            &request.update_mask,
        )
        .await?;
    Ok(Json(event))
}

/// DELETE /api/v1/events/:event_id
pub async fn delete_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(event_id) = path?;
    state.events.delete(caller.user_id, &parse_id(&event_id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/events/:event_id/publish
pub async fn publish_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state.events.publish(caller.user_id, &parse_id(&event_id)?).await?;
    Ok(Json(event))
}

/// POST /api/v1/events/:event_id/unpublish
pub async fn unpublish_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state
        .events
        .unpublish(caller.user_id, &parse_id(&event_id)?)
        .await?;
    Ok(Json(event))
}

/// POST /api/v1/events/:event_id/review
pub async fn send_to_review(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state
        .events
        .send_to_review(caller.user_id, &parse_id(&event_id)?)
        .await?;
    Ok(Json(event))
}

/// DELETE /api/v1/events/:event_id/review
pub async fn revoke_review(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state
        .events
        .revoke_review(caller.user_id, &parse_id(&event_id)?)
        .await?;
    Ok(Json(event))
}

/// POST /api/v1/events/:event_id/approve
pub async fn approve_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state.events.approve(caller.user_id, &parse_id(&event_id)?).await?;
    Ok(Json(event))
}

/// POST /api/v1/events/:event_id/reject
pub async fn reject_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
    request: Result<Json<RejectEventRequest>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let Json(request) = request?;
    let event = state
        .events
        .reject(caller.user_id, &parse_id(&event_id)?, request.reason)
        .await?;
    Ok(Json(event))
}

/// POST /api/v1/events/:event_id/cancel
pub async fn cancel_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state.events.cancel(caller.user_id, &parse_id(&event_id)?).await?;
    Ok(Json(event))
}

/// POST /api/v1/events/:event_id/finish
pub async fn finish_event(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Event>, ApiError> {
    let Path(event_id) = path?;
    let event = state.events.finish(caller.user_id, &parse_id(&event_id)?).await?;
    Ok(Json(event))
}

/// Pending club and organizer invites.
///
/// GET /api/v1/events/:event_id/invites
pub async fn list_event_invites(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<EventInvites>, ApiError> {
    let Path(event_id) = path?;
    let invites = state
        .events
        .list_invites(caller.user_id, &parse_id(&event_id)?)
        .await?;
    Ok(Json(invites))
}
