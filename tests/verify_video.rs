use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use society_ai_service::app::app;
use society_ai_service::gemini::GeminiClient;

fn test_app() -> Router {
    let http = reqwest::Client::new();
    let gemini = Arc::new(GeminiClient::with_config(
        http.clone(),
        "test-key".to_string(),
        "gemini-2.5-flash".to_string(),
    ));
    app(gemini, http)
}

async fn post_verify(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/verify-video")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

fn leftover_temp_files() -> usize {
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with("complaint-video-")
        })
        .count()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_video_url_is_rejected() {
    let (status, body) = post_verify(test_app(), json!({"category": "Garbage Overflow"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "video_url and category are required");
}

#[tokio::test]
async fn missing_category_is_rejected() {
    let (status, body) =
        post_verify(test_app(), json!({"video_url": "http://cdn/clip.mp4"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "video_url and category are required");
}

#[tokio::test]
async fn empty_body_is_rejected_without_side_effects() {
    let before = leftover_temp_files();
    let (status, body) = post_verify(test_app(), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "video_url and category are required");
    assert_eq!(leftover_temp_files(), before);
}

#[tokio::test]
async fn unreachable_video_url_fails_and_cleans_up() {
    let before = leftover_temp_files();

    // Nothing listens on the discard port, so the download fails immediately.
    let (status, body) = post_verify(
        test_app(),
        json!({
            "video_url": "http://127.0.0.1:9/clip.mp4",
            "category": "Garbage Overflow",
            "description": "Bin overflowing for 3 days"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["ai_reasoning"], "Failed to analyze video");
    assert!(body["error"].as_str().unwrap().contains("download"));

    // No temp file left behind for this request
    assert_eq!(leftover_temp_files(), before);
}
