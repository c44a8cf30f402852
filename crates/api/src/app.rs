use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use domain::services::{
    CollaboratorInviteService, EventService, ModerationPolicy, OrganizerInviteService,
    ParticipationService,
};
use domain::Ports;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{collaborators, events, health, organizers, participants};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when the stores are not database backed.
    pub pool: Option<PgPool>,
    pub events: EventService,
    pub organizers: OrganizerInviteService,
    pub collaborators: CollaboratorInviteService,
    pub participation: ParticipationService,
}

impl AppState {
    pub fn new(config: Config, ports: Ports, pool: Option<PgPool>) -> Self {
        let moderation = ModerationPolicy::new(config.moderation.moderator_ids.clone());
        Self {
            events: EventService::new(ports.clone(), moderation),
            organizers: OrganizerInviteService::new(ports.clone()),
            collaborators: CollaboratorInviteService::new(ports.clone()),
            participation: ParticipationService::new(ports),
            config: Arc::new(config),
            pool,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let event_routes = Router::new()
        .route(
            "/api/v1/events",
            post(events::create_event).get(events::list_events),
        )
        .route(
            "/api/v1/events/:event_id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/api/v1/events/:event_id/publish", post(events::publish_event))
        .route(
            "/api/v1/events/:event_id/unpublish",
            post(events::unpublish_event),
        )
        .route(
            "/api/v1/events/:event_id/review",
            post(events::send_to_review).delete(events::revoke_review),
        )
        .route("/api/v1/events/:event_id/approve", post(events::approve_event))
        .route("/api/v1/events/:event_id/reject", post(events::reject_event))
        .route("/api/v1/events/:event_id/cancel", post(events::cancel_event))
        .route("/api/v1/events/:event_id/finish", post(events::finish_event))
        .route(
            "/api/v1/events/:event_id/invites",
            get(events::list_event_invites),
        );

    let invite_routes = Router::new()
        .route(
            "/api/v1/events/:event_id/collaborators",
            post(collaborators::add_collaborator),
        )
        .route(
            "/api/v1/events/:event_id/collaborators/:club_id",
            delete(collaborators::remove_collaborator),
        )
        .route(
            "/api/v1/club-invites/:invite_id",
            post(collaborators::handle_club_invite).delete(collaborators::revoke_club_invite),
        )
        .route(
            "/api/v1/events/:event_id/organizers",
            post(organizers::add_organizer),
        )
        .route(
            "/api/v1/events/:event_id/organizers/:user_id",
            delete(organizers::remove_organizer),
        )
        .route(
            "/api/v1/organizer-invites/:invite_id",
            post(organizers::handle_organizer_invite)
                .delete(organizers::revoke_organizer_invite),
        );

    let participant_routes = Router::new()
        .route(
            "/api/v1/events/:event_id/participation",
            post(participants::participate).delete(participants::cancel_participation),
        )
        .route(
            "/api/v1/events/:event_id/participants",
            get(participants::list_participants),
        )
        .route(
            "/api/v1/events/:event_id/participants/:user_id",
            delete(participants::kick_participant),
        )
        .route(
            "/api/v1/events/:event_id/bans",
            post(participants::ban_participant),
        )
        .route(
            "/api/v1/events/:event_id/bans/:user_id",
            delete(participants::unban_participant),
        );

    // Public routes (no caller identity required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(public_routes)
        .merge(event_routes)
        .merge(invite_routes)
        .merge(participant_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
