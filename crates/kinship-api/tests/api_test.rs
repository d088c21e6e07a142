//! Route tests for the kinship HTTP surface.
//!
//! Requests are driven through the router in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory profile store:
//! - Submission returns 201 with the pending state and quality metrics
//! - Invalid ratings and mistyped bodies are rejected with a JSON 400
//! - Matches poll returns 202 until the worker attaches an envelope
//! - Unknown profiles return 404

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use kinship_api::{router, AppState, ProfileView};
use kinship_core::{Dimension, MatchEnvelope, ProfileRepository};
use kinship_db::MemoryProfileStore;
use kinship_jobs::{MatchQueue, MatchWorker, WorkerConfig, WorkerEvent};
use kinship_match::MatchEngine;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn submission(name: &str, value: i32, opt_in: bool) -> Value {
    let ratings: BTreeMap<&str, i32> = Dimension::ALL.iter().map(|d| (d.as_str(), value)).collect();
    json!({
        "response": {
            "email": format!("{}@example.org", name.to_lowercase()),
            "first_name": name,
            "last_name": "Tester",
            "age": 33,
            "ratings": ratings,
        },
        "match_opt_in": opt_in,
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = router(AppState::new(Arc::new(MemoryProfileStore::new()), None));
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_profile_returns_pending_state() {
    let store = Arc::new(MemoryProfileStore::new());
    let app = router(AppState::new(store.clone(), None));

    let (status, body) = send(
        &app,
        post_json("/api/v1/profiles", &submission("Rowan", 6, true)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"]["state"], "pending_match");
    assert_eq!(body["queued"], false);
    assert!(body["quality"]["completeness"].as_f64().is_some());

    let id: Uuid = serde_json::from_value(body["id"].clone()).unwrap();
    let record = store.get_by_id(id).await.unwrap();
    assert!(record.match_opt_in);
}

#[tokio::test]
async fn test_invalid_rating_is_rejected() {
    let store = Arc::new(MemoryProfileStore::new());
    let app = router(AppState::new(store.clone(), None));

    let mut body = submission("Sage", 5, true);
    body["response"]["ratings"]["agency"] = json!(11);
    let (status, error) = send(&app, post_json("/api/v1/profiles", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().is_some());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_mistyped_body_is_a_json_bad_request() {
    let store = Arc::new(MemoryProfileStore::new());
    let app = router(AppState::new(store.clone(), None));

    let mut unknown_dimension = submission("Tamsin", 5, true);
    unknown_dimension["response"]["ratings"]["charisma"] = json!(5);
    let mut text_rating = submission("Tamsin", 5, true);
    text_rating["response"]["ratings"]["agency"] = json!("seven");
    let mut fractional_rating = submission("Tamsin", 5, true);
    fractional_rating["response"]["ratings"]["agency"] = json!(6.5);

    for body in [unknown_dimension, text_rating, fractional_rating] {
        let (status, error) = send(&app, post_json("/api/v1/profiles", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert!(error["error"].as_str().is_some(), "{}", error);
    }

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/profiles")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, error) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().is_some());

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_unknown_profile_is_not_found() {
    let app = router(AppState::new(Arc::new(MemoryProfileStore::new()), None));
    let id = Uuid::now_v7();

    let (status, _) = send(&app, get(&format!("/api/v1/profiles/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get(&format!("/api/v1/profiles/{}/matches", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_opted_out_profile_has_no_matches() {
    let app = router(AppState::new(Arc::new(MemoryProfileStore::new()), None));
    let (_, body) = send(
        &app,
        post_json("/api/v1/profiles", &submission("Quill", 4, false)),
    )
    .await;
    assert_eq!(body["state"]["state"], "submitted");

    let id = body["id"].as_str().unwrap().to_string();
    let (status, _) = send(&app, get(&format!("/api/v1/profiles/{}/matches", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_matches_pending_then_delivered() {
    let store = Arc::new(MemoryProfileStore::new());
    let repo: Arc<dyn ProfileRepository> = store.clone();

    // No worker yet: the poll reports pending
    let app = router(AppState::new(repo.clone(), None));
    let (_, first) = send(
        &app,
        post_json("/api/v1/profiles", &submission("Linden", 5, true)),
    )
    .await;
    let first_id = first["id"].as_str().unwrap().to_string();
    let (status, body) = send(
        &app,
        get(&format!("/api/v1/profiles/{}/matches", first_id)),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["state"], "pending_match");

    // Start the worker and submit a second profile through a queued router
    let (queue, receiver) = MatchQueue::channel(8);
    let worker = MatchWorker::new(
        repo.clone(),
        MatchEngine::default(),
        WorkerConfig::default().with_recover_pending(false),
    );
    let mut events = worker.events();
    let handle = worker.start(receiver);
    let app = router(AppState::new(repo.clone(), Some(queue)));

    let (status, second) = send(
        &app,
        post_json("/api/v1/profiles", &submission("Maple", 5, true)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["queued"], true);
    let second_id = second["id"].as_str().unwrap().to_string();

    let completed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(WorkerEvent::MatchCompleted { .. }) => return true,
                Ok(WorkerEvent::MatchFailed { .. }) | Err(_) => return false,
                Ok(_) => continue,
            }
        }
    })
    .await
    .unwrap_or(false);
    assert!(completed);

    let (status, body) = send(
        &app,
        get(&format!("/api/v1/profiles/{}/matches", second_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let envelope: MatchEnvelope = serde_json::from_value(body).unwrap();
    assert_eq!(envelope.total_evaluated, 1);
    assert_eq!(envelope.matches[0].candidate_id.to_string(), first_id);
    assert_eq!(envelope.matches[0].final_score, 100.0);

    let (status, body) = send(&app, get(&format!("/api/v1/profiles/{}", second_id))).await;
    assert_eq!(status, StatusCode::OK);
    let view: ProfileView = serde_json::from_value(body).unwrap();
    assert_eq!(view.name, "Maple Tester");
    assert!(view.vector.is_some());
    assert!(view.matches.is_some());

    handle.shutdown().await.unwrap();
}
