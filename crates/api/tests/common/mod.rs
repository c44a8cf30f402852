//! Common test utilities for integration tests.
//!
//! The router is built over the in-memory adapters, so these tests need no
//! database or broker.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use domain::memory::{InMemoryAdapters, InMemoryDirectory};
use domain::models::{Club, User};
use events_api::{
    app::{create_app, AppState},
    config::Config,
    extractors::USER_ID_HEADER,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const ROBOTICS: i64 = 1;
pub const ART: i64 = 2;

/// Owner of the events created in tests; manages Robotics.
pub const OWNER: i64 = 10;
/// Plain Robotics member.
pub const MEMBER: i64 = 20;
/// Manages Art.
pub const ART_MANAGER: i64 = 30;
/// Belongs to no club.
pub const OUTSIDER: i64 = 40;
pub const MODERATOR: i64 = 99;

pub fn user(id: i64, first_name: &str, last_name: &str) -> User {
    User {
        id,
        first_name: first_name.into(),
        last_name: last_name.into(),
        avatar: None,
        barcode: "x".into(),
    }
}

/// Directory fixture shared by the integration tests.
pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_club(Club {
            id: ROBOTICS,
            name: "Robotics".into(),
            logo_url: None,
        })
        .with_club(Club {
            id: ART,
            name: "Art".into(),
            logo_url: None,
        })
        .with_user(user(OWNER, "A", "B"))
        .with_user(user(MEMBER, "C", "D"))
        .with_user(user(ART_MANAGER, "E", "F"))
        .with_user(user(OUTSIDER, "G", "H"))
        .with_user(user(MODERATOR, "M", "O"))
        .with_user(user(7, "P", "Q"))
        .with_user(user(8, "R", "S"))
        .with_manager(OWNER, ROBOTICS)
        .with_member(MEMBER, ROBOTICS)
        .with_member(7, ROBOTICS)
        .with_member(8, ROBOTICS)
        .with_manager(ART_MANAGER, ART)
}

/// Test configuration from the built-in defaults.
pub fn test_config() -> Config {
    Config::from_defaults(&[]).expect("default configuration must load")
}

pub struct TestApp {
    pub router: Router,
    pub adapters: InMemoryAdapters,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_directory(directory())
    }

    pub fn with_directory(directory: InMemoryDirectory) -> Self {
        let adapters = InMemoryAdapters::new(directory);
        let state = AppState::new(test_config(), adapters.ports(), None);
        Self {
            router: create_app(state),
            adapters,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a request and returns the status with the parsed body.
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        (status, parse_response_body(response).await)
    }

    /// Creates a draft event in Robotics owned by [`OWNER`]; returns its id.
    pub async fn create_event(&self) -> String {
        let (status, body) = self
            .call(json_request(
                Method::POST,
                "/api/v1/events",
                json!({ "club_id": ROBOTICS }),
                OWNER,
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Fills every field needed to publish.
    pub async fn make_publishable(&self, event_id: &str, event_type: &str) -> Value {
        self.update(
            event_id,
            json!({
                "title": "Robotics night",
                "type": event_type,
                "start_date": "2030-01-01T00:00:00Z",
                "end_date": "2030-01-02T00:00:00Z",
                "cover_images": [
                    { "url": "u", "name": "c", "type": "image/png", "position": 1 }
                ]
            }),
            &["title", "type", "start_date", "end_date", "cover_images"],
        )
        .await
    }

    pub async fn update(&self, event_id: &str, event: Value, mask: &[&str]) -> Value {
        let (status, body) = self
            .call(json_request(
                Method::PATCH,
                &format!("/api/v1/events/{event_id}"),
                json!({ "event": event, "update_mask": mask }),
                OWNER,
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "update failed: {body}");
        body
    }

    /// Creates and publishes an intra-club event.
    pub async fn live_event(&self) -> String {
        let event_id = self.create_event().await;
        self.make_publishable(&event_id, "INTRA_CLUB").await;
        let (status, body) = self
            .call(post_request(
                &format!("/api/v1/events/{event_id}/publish"),
                OWNER,
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "publish failed: {body}");
        event_id
    }
}

/// Build a JSON request on behalf of `user_id`.
pub fn json_request(method: Method, uri: &str, body: Value, user_id: i64) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a body-less POST on behalf of `user_id`.
pub fn post_request(uri: &str, user_id: i64) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

pub fn get_request(uri: &str, user_id: i64) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

pub fn delete_request(uri: &str, user_id: i64) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}
