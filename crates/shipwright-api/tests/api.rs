//! Router behavior: routing, validation, and authentication.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shipwright_api::{create_router, AppState};
use shipwright_core::TestClock;
use shipwright_pipeline::{DeployPipeline, PipelineConfig};
use shipwright_services::{AiPipeClient, GithubClient};
use tower::ServiceExt;

fn configured_state() -> AppState {
    let clock = Arc::new(TestClock::new());
    let codegen = AiPipeClient::with_api_url("test-key", "http://127.0.0.1:1/v1").unwrap();
    let hosting =
        GithubClient::with_api_base("test-token", "octo", "http://127.0.0.1:1", clock.clone())
            .unwrap();
    let pipeline = DeployPipeline::with_clock(
        Arc::new(codegen),
        Arc::new(hosting),
        PipelineConfig::default(),
        clock,
    );
    AppState {
        pipeline: Some(Arc::new(pipeline)),
        shared_secret: Some("s3cret".to_string()),
        codegen_ready: true,
        hosting_ready: true,
    }
}

fn unconfigured_state() -> AppState {
    AppState { pipeline: None, shared_secret: None, codegen_ready: false, hosting_ready: false }
}

fn deploy_body(secret: &str) -> String {
    json!({
        "email": "dev@example.com",
        "secret": secret,
        "task": "captcha-solver",
        "round": 1,
        "nonce": "n-1",
        "brief": "Build a captcha solver that reads ?url= query inputs",
        "checks": ["repo has MIT license"],
        "evaluation_url": "http://127.0.0.1:1/notify"
    })
    .to_string()
}

fn post_deploy(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/deploy")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_reports_running_service() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let response =
        app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "running");
    assert_eq!(body["service"], "shipwright");
}

#[tokio::test]
async fn health_reports_degraded_when_unconfigured() {
    let app = create_router(unconfigured_state(), Duration::from_secs(30));
    let response =
        app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["codegen"], "unconfigured");
}

#[tokio::test]
async fn health_reports_healthy_when_configured() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let response =
        app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn deploy_accepts_valid_request() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let response = app.oneshot(post_deploy(deploy_body("s3cret"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-Request-Id"));
    let body = body_json(response).await;
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["task"], "captcha-solver");
    assert_eq!(body["round"], 1);
}

#[tokio::test]
async fn deploy_rejects_wrong_secret() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let response = app.oneshot(post_deploy(deploy_body("wrong"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "invalid secret");
}

#[tokio::test]
async fn deploy_rejects_malformed_json() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let response = app.oneshot(post_deploy("{not json".to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn deploy_rejects_invalid_round() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let mut payload: Value = serde_json::from_str(&deploy_body("s3cret")).unwrap();
    payload["round"] = json!(3);
    let response = app.oneshot(post_deploy(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn deploy_rejects_short_brief() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let mut payload: Value = serde_json::from_str(&deploy_body("s3cret")).unwrap();
    payload["brief"] = json!("too short");
    let response = app.oneshot(post_deploy(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("brief"));
}

#[tokio::test]
async fn deploy_rejects_non_data_uri_attachment() {
    let app = create_router(configured_state(), Duration::from_secs(30));
    let mut payload: Value = serde_json::from_str(&deploy_body("s3cret")).unwrap();
    payload["attachments"] =
        json!([{"name": "sample.bin", "url": "https://example.com/sample.bin"}]);
    let response = app.oneshot(post_deploy(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("attachments"));
}

#[tokio::test]
async fn deploy_fails_closed_without_configured_secret() {
    // Validation failures are checked before authentication, but a missing
    // server-side secret must never fall through to acceptance.
    let app = create_router(unconfigured_state(), Duration::from_secs(30));
    let response = app.oneshot(post_deploy(deploy_body("s3cret"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    // The reason is internal; the client only learns the service is unready.
    assert!(!body["message"].as_str().unwrap().contains("secret"));
}
