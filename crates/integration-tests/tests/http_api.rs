//! HTTP surface tests driven through the router with `tower::ServiceExt`,
//! no listening socket involved.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use resona_api_http::state::ApiState;
use resona_core::application::{submission_channel, SubmissionReceiver, TaskRegistry};
use resona_core::port::log_sink::NoopLogSink;
use resona_core::port::time_provider::mocks::FixedTimeProvider;

/// Router plus direct handles on the state behind it. The receiver half of
/// the queue is kept alive so submissions are accepted (no dispatch pool
/// runs here; these tests cover the surface only).
fn test_app() -> (Router, Arc<TaskRegistry>, SubmissionReceiver) {
    let registry = Arc::new(TaskRegistry::new(Arc::new(FixedTimeProvider::new(0))));
    let (tx, rx) = submission_channel();
    let state = ApiState::new(registry.clone(), tx, Arc::new(NoopLogSink));
    (resona_api_http::build_router(state), registry, rx)
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn ping_returns_pong() {
    let (app, _registry, _rx) = test_app();
    let response = get(app, "/ping").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "pong");
}

#[tokio::test]
async fn generate_returns_202_and_job_is_queryable() {
    let (app, _registry, mut rx) = test_app();

    let response = post_json(
        app.clone(),
        "/generate",
        json!({"user_id": "u1", "prompt": "rainy night ambience"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["task_id"], "u1");
    assert_eq!(json["message"], "Task accepted");

    // The submission reached the queue
    let item = rx.recv().await.unwrap();
    assert_eq!(item.id, "u1");

    // And the status is immediately visible
    let response = get(app, "/status/u1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["task_id"], "u1");
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn status_of_unknown_task_is_404() {
    let (app, _registry, _rx) = test_app();
    let response = get(app, "/status/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Task not found");
}

#[tokio::test]
async fn resubmitting_an_active_id_is_409() {
    let (app, _registry, _rx) = test_app();

    let first = post_json(
        app.clone(),
        "/generate",
        json!({"user_id": "u1", "prompt": "first"}),
    )
    .await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = post_json(
        app,
        "/generate",
        json!({"user_id": "u1", "prompt": "second"}),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert!(json["error"].as_str().unwrap().contains("u1"));
}

#[tokio::test]
async fn invalid_submissions_are_400() {
    let (app, _registry, _rx) = test_app();

    for body in [
        json!({"user_id": "", "prompt": "p"}),
        json!({"user_id": "../etc", "prompt": "p"}),
        json!({"user_id": "u1", "prompt": "   "}),
    ] {
        let response = post_json(app.clone(), "/generate", body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn malformed_json_body_is_a_client_error() {
    let (app, _registry, _rx) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/generate")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn queue_reports_every_job_in_exactly_one_bucket() {
    let (app, registry, _rx) = test_app();

    registry.create("a", "p").unwrap();
    registry.create("b", "p").unwrap();
    registry.set_processing("b").unwrap();
    registry.create("c", "p").unwrap();
    registry.set_processing("c").unwrap();
    registry.set_error("c", "boom").unwrap();

    let response = get(app, "/queue").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["total"], 3);
    assert_eq!(json["pending"], json!(["a"]));
    assert_eq!(json["processing"], json!(["b"]));
    assert_eq!(json["done"], json!([]));
    assert_eq!(json["error"], json!(["c"]));
}

#[tokio::test]
async fn download_is_404_until_the_job_is_done() {
    let (app, registry, _rx) = test_app();

    assert_eq!(
        get(app.clone(), "/download/nope").await.status(),
        StatusCode::NOT_FOUND
    );

    registry.create("u1", "p").unwrap();
    assert_eq!(
        get(app.clone(), "/download/u1").await.status(),
        StatusCode::NOT_FOUND
    );

    registry.set_processing("u1").unwrap();
    assert_eq!(
        get(app, "/download/u1").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn download_serves_the_finished_artifact() {
    let (app, registry, _rx) = test_app();

    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("u1.wav");
    tokio::fs::write(&artifact, b"RIFF....WAVE").await.unwrap();

    registry.create("u1", "p").unwrap();
    registry.set_processing("u1").unwrap();
    registry.set_done("u1", artifact.clone()).unwrap();

    let response = get(app, "/download/u1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/wav"
    );
    assert!(response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("u1.wav"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"RIFF....WAVE");
}

#[tokio::test]
async fn reaped_artifact_turns_download_into_404() {
    let (app, registry, _rx) = test_app();

    registry.create("u1", "p").unwrap();
    registry.set_processing("u1").unwrap();
    registry
        .set_done("u1", PathBuf::from("/nonexistent/u1.wav"))
        .unwrap();

    let response = get(app, "/download/u1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, _registry, _rx) = test_app();
    assert_eq!(
        get(app, "/this-route-does-not-exist").await.status(),
        StatusCode::NOT_FOUND
    );
}
