//! Integration tests for the event lifecycle endpoints.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{
    delete_request, get_request, json_request, post_request, TestApp, MEMBER, MODERATOR,
    OUTSIDER, OWNER, ROBOTICS,
};
use serde_json::json;

// ============================================================================
// Create / Get
// ============================================================================

#[tokio::test]
async fn test_create_event_returns_draft_with_owner_as_organizer() {
    let app = TestApp::new();

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/v1/events",
            json!({ "club_id": ROBOTICS }),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "DRAFT");
    assert_eq!(body["owner_user_id"], OWNER);
    assert_eq!(body["owner_club_id"], ROBOTICS);
    assert_eq!(body["organizers"].as_array().unwrap().len(), 1);
    assert_eq!(body["organizers"][0]["user"]["id"], OWNER);
    assert_eq!(body["id"].as_str().unwrap().len(), 24);
}

#[tokio::test]
async fn test_create_event_without_permission_is_forbidden() {
    let app = TestApp::new();

    let (status, body) = app
        .call(json_request(
            Method::POST,
            "/api/v1/events",
            json!({ "club_id": ROBOTICS }),
            MEMBER,
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");
}

#[tokio::test]
async fn test_missing_caller_is_unauthenticated() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/events")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.call(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_get_with_malformed_id_is_invalid_argument() {
    let app = TestApp::new();

    let (status, body) = app
        .call(get_request("/api/v1/events/not-an-id", OWNER))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
}

#[tokio::test]
async fn test_get_unknown_event_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app
        .call(get_request("/api/v1/events/0123456789abcdef01234567", OWNER))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_draft_is_hidden_from_outsiders() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let (status, _) = app
        .call(get_request(&format!("/api/v1/events/{event_id}"), OUTSIDER))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(get_request(&format!("/api/v1/events/{event_id}"), OWNER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], event_id.as_str());
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_applies_only_masked_fields() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let body = app
        .update(
            &event_id,
            json!({ "title": "Hackathon", "description": "ignored", "tags": [" ai ", "ai", "ml"] }),
            &["title", "tags"],
        )
        .await;

    assert_eq!(body["title"], "Hackathon");
    assert_eq!(body["description"], "");
    assert_eq!(body["tags"], json!(["ai", "ml"]));
}

#[tokio::test]
async fn test_empty_mask_is_noop() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let (_, before) = app
        .call(get_request(&format!("/api/v1/events/{event_id}"), OWNER))
        .await;

    let after = app
        .update(&event_id, json!({ "title": "Changed" }), &[])
        .await;

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_rejects_unknown_path() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let (status, body) = app
        .call(json_request(
            Method::PATCH,
            &format!("/api/v1/events/{event_id}"),
            json!({ "event": {}, "update_mask": ["owner_user_id"] }),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
}

#[tokio::test]
async fn test_cover_position_bounds() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let uri = format!("/api/v1/events/{event_id}");

    let accepted = app
        .update(
            &event_id,
            json!({ "cover_images": [{ "url": "u", "name": "c", "type": "image/png", "position": 0 }] }),
            &["cover_images"],
        )
        .await;
    assert_eq!(accepted["cover_images"][0]["position"], 0);

    let (status, _) = app
        .call(json_request(
            Method::PATCH,
            &uri,
            json!({
                "event": { "cover_images": [{ "url": "u", "name": "c", "type": "image/png", "position": 21 }] },
                "update_mask": ["cover_images"]
            }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tag_length_bounds() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let accepted = app
        .update(&event_id, json!({ "tags": ["ai"] }), &["tags"])
        .await;
    assert_eq!(accepted["tags"], json!(["ai"]));

    let (status, _) = app
        .call(json_request(
            Method::PATCH,
            &format!("/api/v1/events/{event_id}"),
            json!({ "event": { "tags": ["a"] }, "update_mask": ["tags"] }),
            OWNER,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_by_non_owner_is_forbidden() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let (status, _) = app
        .call(json_request(
            Method::PATCH,
            &format!("/api/v1/events/{event_id}"),
            json!({ "event": { "title": "Mine now" }, "update_mask": ["title"] }),
            MEMBER,
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_intra_club_happy_path() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    app.make_publishable(&event_id, "INTRA_CLUB").await;

    let (status, body) = app
        .call(post_request(
            &format!("/api/v1/events/{event_id}/publish"),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_PROGRESS");
}

#[tokio::test]
async fn test_publish_lists_missing_fields() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let (status, body) = app
        .call(post_request(
            &format!("/api/v1/events/{event_id}/publish"),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["error"], "failed_precondition");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("title"));
    assert!(message.contains("start_date"));
}

#[tokio::test]
async fn test_university_moderation_flow() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    app.make_publishable(&event_id, "UNIVERSITY").await;
    let base = format!("/api/v1/events/{event_id}");

    let (status, body) = app
        .call(post_request(&format!("{base}/review"), OWNER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");

    let (status, _) = app
        .call(post_request(&format!("{base}/approve"), OWNER))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "owner must not approve");

    let (status, body) = app
        .call(post_request(&format!("{base}/approve"), MODERATOR))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["approve_metadata"]["approved_by"]["id"], MODERATOR);

    let (status, body) = app
        .call(post_request(&format!("{base}/publish"), OWNER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_PROGRESS");

    let (status, body) = app
        .call(post_request(&format!("{base}/unpublish"), OWNER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");
}

#[tokio::test]
async fn test_revoke_review_returns_to_draft() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    app.make_publishable(&event_id, "UNIVERSITY").await;
    let base = format!("/api/v1/events/{event_id}");
    app.call(post_request(&format!("{base}/review"), OWNER)).await;

    let (status, body) = app
        .call(delete_request(&format!("{base}/review"), OWNER))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DRAFT");
    assert!(body["reject_metadata"].is_object());
}

#[tokio::test]
async fn test_reject_records_reason() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    app.make_publishable(&event_id, "UNIVERSITY").await;
    let base = format!("/api/v1/events/{event_id}");
    app.call(post_request(&format!("{base}/review"), OWNER)).await;

    let (status, body) = app
        .call(json_request(
            Method::POST,
            &format!("{base}/reject"),
            json!({ "reason": "Missing venue" }),
            MODERATOR,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "REJECTED");
    assert_eq!(body["reject_metadata"]["reason"], "Missing venue");

    // Rejected events stay editable and do not re-enter review.
    let body = app
        .update(&event_id, json!({ "location_university": "Hall B" }), &["location_university"])
        .await;
    assert_eq!(body["status"], "REJECTED");
}

#[tokio::test]
async fn test_forbidden_transition_is_precondition_failure() {
    let app = TestApp::new();
    let event_id = app.create_event().await;

    let (status, body) = app
        .call(post_request(
            &format!("/api/v1/events/{event_id}/finish"),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["error"], "failed_precondition");
}

#[tokio::test]
async fn test_cancel_then_cancel_again() {
    let app = TestApp::new();
    let event_id = app.live_event().await;
    let uri = format!("/api/v1/events/{event_id}/cancel");

    let (status, body) = app.call(post_request(&uri, OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");

    let (status, _) = app.call(post_request(&uri, OWNER)).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_finish_live_event() {
    let app = TestApp::new();
    let event_id = app.live_event().await;

    let (status, body) = app
        .call(post_request(
            &format!("/api/v1/events/{event_id}/finish"),
            OWNER,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FINISHED");
}

#[tokio::test]
async fn test_delete_archives_event() {
    let app = TestApp::new();
    let event_id = app.create_event().await;
    let uri = format!("/api/v1/events/{event_id}");

    let response = app.send(delete_request(&uri, OWNER)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = app.call(get_request(&uri, OWNER)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// List
// ============================================================================

#[tokio::test]
async fn test_list_filters_by_status_and_paginates() {
    let app = TestApp::new();
    let live = app.live_event().await;
    app.create_event().await;

    let (status, body) = app
        .call(get_request(
            "/api/v1/events?statuses=IN_PROGRESS&page=1&page_size=10",
            OUTSIDER,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["id"], live.as_str());
    assert_eq!(body["page_info"]["total"], 1);
    assert_eq!(body["page_info"]["page_size"], 10);
}

#[tokio::test]
async fn test_list_rejects_bad_parameters() {
    let app = TestApp::new();

    let (status, _) = app
        .call(get_request("/api/v1/events?page_size=101", OWNER))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(get_request("/api/v1/events?sort_by=popularity", OWNER))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(get_request("/api/v1/events?page=0", OWNER))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Outbound events
// ============================================================================

#[tokio::test]
async fn test_publish_emits_domain_event() {
    let app = TestApp::new();
    app.live_event().await;

    let publisher = &app.adapters.publisher;
    let timeout = std::time::Duration::from_secs(5);
    assert!(publisher.wait_for("event.created", timeout).await);
    assert!(publisher.wait_for("event.status_changed", timeout).await);

    let keys: Vec<String> = publisher
        .published()
        .await
        .iter()
        .map(|e| e.routing_key())
        .collect();
    assert!(keys.iter().any(|k| k == "event.created"), "{keys:?}");
    assert!(keys.iter().any(|k| k == "event.status_changed"), "{keys:?}");
}
