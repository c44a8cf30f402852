//! Integration tests for organizer and collaborator invitations.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{
    delete_request, get_request, json_request, user, TestApp, ART, ART_MANAGER, MEMBER,
    OUTSIDER, OWNER, ROBOTICS,
};
use domain::models::Organizer;
use domain::ports::EventStore;
use serde_json::{json, Value};
use shared::Id;

async fn invite_member(app: &TestApp, event_id: &str) -> String {
    let (status, body) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/organizers"),
            json!({ "user_id": MEMBER, "club_id": ROBOTICS }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {body}");
    body["id"].as_str().unwrap().to_string()
}

async fn invite_art(app: &TestApp, event_id: &str) -> String {
    let (status, body) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/collaborators"),
            json!({ "club_id": ART }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {body}");
    body["id"].as_str().unwrap().to_string()
}

fn organizer_ids(event: &Value) -> Vec<i64> {
    event["organizers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["user"]["id"].as_i64().unwrap())
        .collect()
}

// ============================================================================
// Organizer invites
// ============================================================================

#[tokio::test]
async fn test_organizer_invite_accept() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let invite_id = invite_member(&app, &event_id).await;
    let uri = format!("/api/v1/organizer-invites/{invite_id}");

    let (status, _) = app
        .call(json_request(Method::POST, &uri, json!({ "action": "ACCEPT" }), OWNER))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "only the target may answer");

    let (status, body) = app
        .call(json_request(Method::POST, &uri, json!({ "action": "ACCEPT" }), MEMBER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(organizer_ids(&body), vec![OWNER, MEMBER]);
    assert_eq!(body["organizers"][1]["club_id"], ROBOTICS);
    assert_eq!(body["organizers"][1]["invited_by_user_id"], OWNER);

    let (status, _) = app
        .call(json_request(Method::POST, &uri, json!({ "action": "ACCEPT" }), MEMBER))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "invite is consumed");
}

#[tokio::test]
async fn test_organizer_invite_reject_and_duplicate() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let invite_id = invite_member(&app, &event_id).await;

    let (status, body) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/organizers"),
            json!({ "user_id": MEMBER, "club_id": ROBOTICS }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_exists");

    let response = app
        .send(json_request(
            Method::POST,
            &format!("/api/v1/organizer-invites/{invite_id}"),
            json!({ "action": "REJECT" }),
            MEMBER,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, event) = app
        .call(get_request(&format!("/api/v1/events/{event_id}"), OWNER))
        .await;
    assert_eq!(organizer_ids(&event), vec![OWNER]);
}

#[tokio::test]
async fn test_organizer_invite_preconditions() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let uri = format!("/api/v1/events/{event_id}/organizers");

    // Target outside the club.
    let (status, _) = app
        .call(json_request(
            Method::POST,
            &uri,
            json!({ "user_id": OUTSIDER, "club_id": ROBOTICS }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    // Inviter represents another club.
    let (status, _) = app
        .call(json_request(
            Method::POST,
            &uri,
            json!({ "user_id": ART_MANAGER, "club_id": ART }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    // Caller is not an organizer.
    let (status, _) = app
        .call(json_request(
            Method::POST,
            &uri,
            json!({ "user_id": 7, "club_id": ROBOTICS }),
            MEMBER,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Already organizing.
    let (status, _) = app
        .call(json_request(
            Method::POST,
            &uri,
            json!({ "user_id": OWNER, "club_id": ROBOTICS }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_revoke_organizer_invite_lists_no_invites() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let invite_id = invite_member(&app, &event_id).await;

    let (status, invites) = app
        .call(get_request(&format!("/api/v1/events/{event_id}/invites"), OWNER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invites["organizer_invites"].as_array().unwrap().len(), 1);

    let response = app
        .send(delete_request(
            &format!("/api/v1/organizer-invites/{invite_id}"),
            OWNER,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, invites) = app
        .call(get_request(&format!("/api/v1/events/{event_id}/invites"), OWNER))
        .await;
    assert!(invites["organizer_invites"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_organizer() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let invite_id = invite_member(&app, &event_id).await;
    app.call(json_request(
        Method::POST,
        &format!("/api/v1/organizer-invites/{invite_id}"),
        json!({ "action": "ACCEPT" }),
        MEMBER,
    ))
    .await;

    let (status, _) = app
        .call(delete_request(
            &format!("/api/v1/events/{event_id}/organizers/{OWNER}"),
            MEMBER,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "owner cannot be removed");

    let (status, body) = app
        .call(delete_request(
            &format!("/api/v1/events/{event_id}/organizers/{MEMBER}"),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(organizer_ids(&body), vec![OWNER]);
}

// ============================================================================
// Collaborator invites
// ============================================================================

#[tokio::test]
async fn test_collaborator_invite_requires_manager() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let invite_id = invite_art(&app, &event_id).await;

    let (status, _) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/club-invites/{invite_id}"),
            json!({ "action": "ACCEPT" }),
            MEMBER,
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_own_club_cannot_collaborate() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let (status, _) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/collaborators"),
            json!({ "club_id": ROBOTICS }),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_removing_collaborator_drops_its_organizers() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let invite_id = invite_art(&app, &event_id).await;

    let (status, body) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/club-invites/{invite_id}"),
            json!({ "action": "ACCEPT" }),
            ART_MANAGER,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collaborator_clubs"][0]["id"], ART);

    // Seat an Art organizer directly in the store.
    let id: Id = event_id.parse().unwrap();
    let mut event = app.adapters.events.raw(&id).await.unwrap();
    let expected = event.updated_at;
    event
        .add_organizer(Organizer {
            user: user(ART_MANAGER, "E", "F"),
            club_id: ART,
            invited_by_user_id: OWNER,
        })
        .unwrap();
    event.touch(Utc::now());
    app.adapters.events.update(&event, expected).await.unwrap();

    let (status, body) = app
        .call(delete_request(
            &format!("/api/v1/events/{event_id}/collaborators/{ART}"),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(organizer_ids(&body), vec![OWNER]);
    assert!(body["collaborator_clubs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_collaborator_reject_and_revoke() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let invite_id = invite_art(&app, &event_id).await;
    let response = app
        .send(json_request(
            Method::POST,
            &format!("/api/v1/club-invites/{invite_id}"),
            json!({ "action": "REJECT" }),
            ART_MANAGER,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let invite_id = invite_art(&app, &event_id).await;
    let (status, _) = app
        .call(delete_request(
            &format!("/api/v1/club-invites/{invite_id}"),
            ART_MANAGER,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "only the owner revokes");

    let response = app
        .send(delete_request(
            &format!("/api/v1/club-invites/{invite_id}"),
            OWNER,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_invites_closed_on_cancelled_event() {
    let app = TestApp::new();
    let event_id = app.live_event().await;
    app.call(common::post_request(
        &format!("/api/v1/events/{event_id}/cancel"),
        OWNER,
    ))
    .await;

    let (status, _) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/collaborators"),
            json!({ "club_id": ART }),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_accept_after_cancel_is_precondition_failure() {
    let app = TestApp::new();
    let event_id = app.live_event().await;
    let organizer_invite = invite_member(&app, &event_id).await;
    let club_invite = invite_art(&app, &event_id).await;
    app.call(common::post_request(
        &format!("/api/v1/events/{event_id}/cancel"),
        OWNER,
    ))
    .await;

    let (status, _) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/organizer-invites/{organizer_invite}"),
            json!({ "action": "ACCEPT" }),
            MEMBER,
        ))
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (status, _) = app
        .call(json_request(
            Method::POST,
            &format!("/api/v1/club-invites/{club_invite}"),
            json!({ "action": "ACCEPT" }),
            ART_MANAGER,
        ))
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (_, event) = app
        .call(get_request(&format!("/api/v1/events/{event_id}"), OWNER))
        .await;
    assert_eq!(organizer_ids(&event), vec![OWNER]);
    assert!(event["collaborator_clubs"].as_array().unwrap().is_empty());
}
