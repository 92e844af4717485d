//! Integration tests for the assembled router.
//!
//! Requests go through every layer (CORS, request spans, metrics) via
//! `tower::ServiceExt::oneshot`.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{create_failing_app_state, create_test_app_state};
use todo_service::api::build_router;
use todo_service::config::TelemetryConfig;
use todo_service::telemetry::PROMETHEUS_CONTENT_TYPE;

#[fixture]
fn application() -> Router {
    build_router(create_test_app_state(), &TelemetryConfig::default())
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(application: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = application.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(application: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(application, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// CRUD Round Trip
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_crud_flow(application: Router) {
    let (status, created) = send_json(
        &application,
        json_request(Method::POST, "/todos", &json!({ "task": "Buy milk" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["task"], "Buy milk");
    assert_eq!(created["completed"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send_json(
        &application,
        json_request(
            Method::PUT,
            &format!("/todos/{id}"),
            &json!({ "completed": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated, json!({ "id": id, "task": "Buy milk", "completed": true }));

    let (status, listed) = send_json(&application, empty_request(Method::GET, "/todos")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([updated]));

    let (status, deleted) = send_json(
        &application,
        empty_request(Method::DELETE, &format!("/todos/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "message": "Todo deleted" }));

    let (_, listed) = send_json(&application, empty_request(Method::GET, "/todos")).await;
    assert_eq!(listed, json!([]));
}

#[rstest]
#[case("  Buy milk  ".to_string())]
#[case("x".repeat(501))]
#[case("y".repeat(5_000))]
#[tokio::test]
async fn test_task_text_is_stored_as_sent(application: Router, #[case] task: String) {
    let (status, created) = send_json(
        &application,
        json_request(Method::POST, "/todos", &json!({ "task": task })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["task"], task.as_str());

    let id = created["id"].as_str().unwrap().to_string();
    let (status, updated) = send_json(
        &application,
        json_request(
            Method::PUT,
            &format!("/todos/{id}"),
            &json!({ "task": format!(" {task} ") }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["task"], format!(" {task} "));

    let (_, listed) = send_json(&application, empty_request(Method::GET, "/todos")).await;
    assert_eq!(listed[0]["task"], format!(" {task} "));
}

// =============================================================================
// Error Bodies
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_create_missing_task_is_validation_error(application: Router) {
    let (status, body) = send_json(
        &application,
        json_request(Method::POST, "/todos", &json!({ "completed": true })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "task");
    assert!(body["message"].as_str().is_some_and(|message| !message.is_empty()));
}

#[rstest]
#[case(Some("application/json"), "{not json")]
#[case(Some("application/json"), r#"{"task": 42}"#)]
#[case(None, r#"{"task": "No content type"}"#)]
#[tokio::test]
async fn test_malformed_body_is_bad_request(
    application: Router,
    #[case] content_type: Option<&str>,
    #[case] body: &'static str,
) {
    let mut builder = Request::builder().method(Method::POST).uri("/todos");
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(Body::from(body)).unwrap();

    let (status, body) = send_json(&application, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[rstest]
#[tokio::test]
async fn test_malformed_id_is_bad_request(application: Router) {
    let (status, body) = send_json(
        &application,
        empty_request(Method::DELETE, "/todos/507f1f77bcf86cd799439011"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "id");
}

#[rstest]
#[tokio::test]
async fn test_update_unknown_id_is_not_found(application: Router) {
    let (status, body) = send_json(
        &application,
        json_request(
            Method::PUT,
            "/todos/0192f3a4-5b6c-7d8e-9f01-23456789abcd",
            &json!({ "completed": true }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[rstest]
#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let application = build_router(
        create_failing_app_state("connection refused"),
        &TelemetryConfig::default(),
    );

    let (status, body) = send_json(&application, empty_request(Method::GET, "/todos")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert!(body["message"].as_str().unwrap().contains("connection refused"));
}

// =============================================================================
// Health, CORS, Metrics
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_health(application: Router) {
    let (status, body) = send_json(&application, empty_request(Method::GET, "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[rstest]
#[tokio::test]
async fn test_cors_allows_any_origin(application: Router) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/todos")
        .header(header::ORIGIN, "http://frontend.example")
        .body(Body::empty())
        .unwrap();

    let response = application.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[rstest]
#[tokio::test]
async fn test_cors_preflight(application: Router) {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/todos/abc")
        .header(header::ORIGIN, "http://frontend.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();

    let response = application.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS)
    );
}

#[rstest]
#[tokio::test]
async fn test_metrics_records_route_templates(application: Router) {
    send(&application, empty_request(Method::GET, "/todos")).await;
    send(
        &application,
        empty_request(Method::DELETE, "/todos/0192f3a4-5b6c-7d8e-9f01-23456789abcd"),
    )
    .await;

    let response = application
        .clone()
        .oneshot(empty_request(Method::GET, "/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        PROMETHEUS_CONTENT_TYPE
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(r#"http_requests_total{method="GET",route="/todos",status_code="200"} 1"#));
    assert!(text.contains(
        r#"http_requests_total{method="DELETE",route="/todos/{id}",status_code="200"} 1"#
    ));
    assert!(!text.contains(r#"route="/metrics""#));
}

#[rstest]
#[tokio::test]
async fn test_metrics_unmatched_paths_share_one_series(application: Router) {
    for index in 0..50 {
        let (status, _) = send(
            &application,
            empty_request(Method::GET, &format!("/nope-{index}")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (_, body) = send(&application, empty_request(Method::GET, "/metrics")).await;
    let text = String::from_utf8(body).unwrap();

    assert!(text.contains(
        r#"http_requests_total{method="GET",route="<unmatched>",status_code="404"} 50"#
    ));
    assert!(!text.contains("/nope-"));
    let counter_series = text
        .lines()
        .filter(|line| line.starts_with("http_requests_total{"))
        .count();
    assert_eq!(counter_series, 1);
}

#[rstest]
#[tokio::test]
async fn test_metrics_disabled_hides_endpoint() {
    let telemetry = TelemetryConfig {
        metrics_enabled: false,
        ..TelemetryConfig::default()
    };
    let application = build_router(create_test_app_state(), &telemetry);

    let (status, _) = send(&application, empty_request(Method::GET, "/metrics")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
