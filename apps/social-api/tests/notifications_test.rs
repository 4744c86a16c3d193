mod common;

use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use serde_json::Value;

async fn unread_count(server: &TestServer, token: &str) -> i64 {
    server
        .get("/api/v1/notifications/unread-count")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .json::<Value>()["count"]
        .as_i64()
        .unwrap()
}

// ---------------------------------------------------------------------------
// GET /api/v1/notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_requires_auth() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/api/v1/notifications").await;
    resp.assert_status_unauthorized();
    assert_eq!(resp.json::<Value>()["error"]["code"], "UNAUTHORIZED");

    server
        .get("/api/v1/notifications")
        .add_header(AUTHORIZATION, "Bearer sat_bogus")
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn list_is_newest_first_and_paged() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let user_id = common::new_user_id();
    let actor_id = common::new_user_id();
    let token = common::access_token_for(&state, &user_id, "bob").await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let n = common::seed_like(&state, &user_id, &actor_id, &format!("post_{i}")).await;
        ids.push(n.id.to_string());
    }

    let resp = server
        .get("/api/v1/notifications")
        .add_query_param("page", 0)
        .add_query_param("size", 2)
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();

    let body: Value = resp.json();
    assert_eq!(body["total_count"], 5);
    assert_eq!(body["has_more"], true);
    let page: Vec<&str> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(page, vec![ids[4].as_str(), ids[3].as_str()]);

    let last: Value = server
        .get("/api/v1/notifications")
        .add_query_param("page", 2)
        .add_query_param("size", 2)
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .json();
    assert_eq!(last["has_more"], false);
    assert_eq!(last["notifications"].as_array().unwrap().len(), 1);
    assert_eq!(last["notifications"][0]["id"], ids[0]);
}

#[tokio::test]
async fn list_record_has_expected_shape() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let user_id = common::new_user_id();
    let actor_id = common::new_user_id();
    let token = common::access_token_for(&state, &user_id, "bob").await;
    common::seed_like(&state, &user_id, &actor_id, "post_1").await;

    let body: Value = server
        .get("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .json();
    let n = &body["notifications"][0];
    assert!(n["id"].is_string());
    assert_eq!(n["user_id"], user_id);
    assert_eq!(n["actor_id"], actor_id);
    assert_eq!(n["type"], "LIKE");
    assert_eq!(n["reference_id"], "post_1");
    assert_eq!(n["read"], false);
    assert!(n["created_at"].is_string());
}

#[tokio::test]
async fn unread_filter_excludes_read_notifications() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let user_id = common::new_user_id();
    let actor_id = common::new_user_id();
    let token = common::access_token_for(&state, &user_id, "bob").await;

    let first = common::seed_like(&state, &user_id, &actor_id, "post_1").await;
    common::seed_like(&state, &user_id, &actor_id, "post_2").await;
    state.notifications.mark_read(first.id, &user_id).await.unwrap();

    let body: Value = server
        .get("/api/v1/notifications")
        .add_query_param("filter", "unread")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .json();
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["notifications"][0]["reference_id"], "post_2");

    let unread: Value = server
        .get("/api/v1/notifications/unread")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .json();
    assert_eq!(unread.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_filter_is_rejected() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let token = common::access_token_for(&state, &common::new_user_id(), "bob").await;

    let resp = server
        .get("/api/v1/notifications")
        .add_query_param("filter", "starred")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_bad_request();
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());

    server
        .get("/api/v1/notifications")
        .add_query_param("size", "lots")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status_bad_request();
}

// ---------------------------------------------------------------------------
// Unread count and read state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unread_count_tracks_read_state() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let user_id = common::new_user_id();
    let actor_id = common::new_user_id();
    let token = common::access_token_for(&state, &user_id, "bob").await;

    let n = common::seed_like(&state, &user_id, &actor_id, "post_1").await;
    common::seed_like(&state, &user_id, &actor_id, "post_2").await;

    assert_eq!(unread_count(&server, &token).await, 2);

    let resp = server
        .put(&format!("/api/v1/notifications/{}/read", n.id))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<Value>()["read"], true);
    assert_eq!(unread_count(&server, &token).await, 1);

    // Marking again is a no-op, not an error.
    server
        .put(&format!("/api/v1/notifications/{}/read", n.id))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status_ok();
    assert_eq!(unread_count(&server, &token).await, 1);
}

#[tokio::test]
async fn mark_read_of_unknown_notification_is_not_found() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let token = common::access_token_for(&state, &common::new_user_id(), "bob").await;

    let resp = server
        .put("/api/v1/notifications/123456789/read")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_not_found();
    assert_eq!(resp.json::<Value>()["error"]["code"], "NOT_FOUND");

    server
        .put("/api/v1/notifications/not-a-number/read")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn mark_read_of_someone_elses_notification_is_forbidden() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let owner_id = common::new_user_id();
    let intruder_id = common::new_user_id();
    let n = common::seed_like(&state, &owner_id, &common::new_user_id(), "post_1").await;
    let token = common::access_token_for(&state, &intruder_id, "mallory").await;

    let resp = server
        .put(&format!("/api/v1/notifications/{}/read", n.id))
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    resp.assert_status_forbidden();
    assert_eq!(resp.json::<Value>()["error"]["code"], "FORBIDDEN");

    assert_eq!(state.notifications.unread_count(&owner_id).await.unwrap(), 1);
}

#[tokio::test]
async fn read_all_only_touches_the_caller() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let user_id = common::new_user_id();
    let other_id = common::new_user_id();
    let actor_id = common::new_user_id();
    let token = common::access_token_for(&state, &user_id, "bob").await;

    common::seed_like(&state, &user_id, &actor_id, "post_1").await;
    common::seed_like(&state, &user_id, &actor_id, "post_2").await;
    common::seed_like(&state, &other_id, &actor_id, "post_3").await;

    server
        .put("/api/v1/notifications/read-all")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    assert_eq!(state.notifications.unread_count(&user_id).await.unwrap(), 0);
    assert_eq!(state.notifications.unread_count(&other_id).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_all_clears_only_the_caller() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let user_id = common::new_user_id();
    let other_id = common::new_user_id();
    let actor_id = common::new_user_id();
    let token = common::access_token_for(&state, &user_id, "bob").await;

    common::seed_like(&state, &user_id, &actor_id, "post_1").await;
    common::seed_like(&state, &other_id, &actor_id, "post_2").await;

    server
        .delete("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    let body: Value = server
        .get("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .json();
    assert_eq!(body["total_count"], 0);
    assert_eq!(state.notifications.unread_count(&other_id).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Producer path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn self_like_records_nothing() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let user_id = common::new_user_id();
    let token = common::access_token_for(&state, &user_id, "alice").await;
    let me = social_api::auth::identity::Identity {
        user_id: user_id.clone(),
        username: "alice".into(),
    };

    assert!(state
        .activity()
        .post_liked(&me, &user_id, "post_1")
        .await
        .is_none());

    let body: Value = server
        .get("/api/v1/notifications")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
        .json();
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected_users"], 0);
}
