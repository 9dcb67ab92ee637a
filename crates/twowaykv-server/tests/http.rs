//! HTTP integration tests driven through the router without a listener.

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use twowaykv::{BidirectionalIndex, IndexBuilder};
use twowaykv_server::{build_router, AppState};

fn test_app() -> Router {
    let index = BidirectionalIndex::in_memory().expect("failed to create index");
    build_router(AppState::new(index))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("collect body").to_bytes();
    (status, bytes)
}

async fn json_request(app: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let (status, bytes) = send(app, request).await;
    let json = serde_json::from_slice(&bytes).expect("valid JSON response");
    (status, json)
}

fn post_entries(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).expect("request")
}

fn entry_keys(json: &JsonValue) -> Vec<String> {
    let mut keys: Vec<String> = json["entries"]
        .as_array()
        .expect("entries array")
        .iter()
        .map(|e| e["key"].as_str().expect("key").to_string())
        .collect();
    keys.sort();
    keys
}

// ============================================================================
// POST /entries
// ============================================================================

#[tokio::test]
async fn create_new_keys() {
    let app = test_app();

    let (status, json) =
        json_request(&app, post_entries("/entries", json!([{"key": "test1"}, {"key": "test2"}])))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry_keys(&json), vec!["test1", "test2"]);
    assert_eq!(json["errors"], json!([]));
}

#[tokio::test]
async fn existing_key_reported_when_not_muted() {
    let app = test_app();
    let (_, first) =
        json_request(&app, post_entries("/entries", json!([{"key": "alreadyExists"}]))).await;

    let (status, second) = json_request(
        &app,
        post_entries("/entries?mute_already_exists=false", json!([{"key": "alreadyExists"}])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["entries"], first["entries"]);
    assert_eq!(second["errors"], json!(["Key alreadyExists already exists in DB"]));
}

#[tokio::test]
async fn lookup_by_value() {
    let app = test_app();
    let (_, created) =
        json_request(&app, post_entries("/entries", json!([{"key": "by-value"}]))).await;
    let value = created["entries"][0]["value"].as_u64().expect("value");

    let (status, json) = json_request(
        &app,
        post_entries("/entries", json!([{"value": value}, {"value": 12345}])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["entries"], json!([{"key": "by-value", "value": value}]));
    assert_eq!(json["errors"], json!(["Value 12345 not found in DB"]));
}

#[tokio::test]
async fn empty_body_is_rejected() {
    let app = test_app();

    let (status, json) = json_request(&app, post_entries("/entries", json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"code": 400, "error": "Bad []entry or no entries passed"}));
}

#[tokio::test]
async fn entry_without_key_or_value_is_rejected() {
    let app = test_app();

    let (status, json) =
        json_request(&app, post_entries("/entries", json!([{"key": "ok"}, {"key": "", "value": 0}])))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Must provide valid key or value query string");
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/entries")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, json) = json_request(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
}

// ============================================================================
// GET /entries/random and /entries/search
// ============================================================================

#[tokio::test]
async fn random_returns_requested_count() {
    let app = test_app();
    let keys: Vec<JsonValue> = (0..200).map(|i| json!({"key": format!("k{i}")})).collect();
    let (status, _) = json_request(&app, post_entries("/entries", JsonValue::Array(keys))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = json_request(&app, get("/entries/random?n=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["entries"].as_array().expect("entries").len(), 5);
}

#[tokio::test]
async fn random_rejects_out_of_range() {
    let app = test_app();

    for uri in ["/entries/random", "/entries/random?n=0", "/entries/random?n=26"] {
        let (status, json) = json_request(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["code"], 400);
    }

    let (status, _) = send(&app, get("/entries/random?n=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn random_on_small_store_is_not_found() {
    let app = test_app();
    json_request(&app, post_entries("/entries", json!([{"key": "only"}]))).await;

    let (status, json) = json_request(&app, get("/entries/random?n=3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().expect("error").starts_with("max collisions reached"));
}

#[tokio::test]
async fn search_by_prefix() {
    let app = test_app();
    let mut keys: Vec<JsonValue> =
        (0..10).map(|i| json!({"key": format!("TEST-KEY-{i}")})).collect();
    keys.push(json!({"key": "OTHER"}));
    json_request(&app, post_entries("/entries", JsonValue::Array(keys))).await;

    let (status, json) = json_request(&app, get("/entries/search?prefix=TES")).await;
    assert_eq!(status, StatusCode::OK);
    let expected: Vec<String> = (0..10).map(|i| format!("TEST-KEY-{i}")).collect();
    assert_eq!(entry_keys(&json), expected);

    let (status, _) = json_request(&app, get("/entries/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Export, health and metrics
// ============================================================================

#[tokio::test]
async fn export_is_jsonl_attachment() {
    let app = test_app();
    json_request(&app, post_entries("/entries", json!([{"key": "a"}, {"key": "b"}]))).await;

    let response = app.clone().oneshot(get("/export")).await.expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .expect("content disposition");
    assert!(disposition.contains("twowaykv_export.jsonl"));

    let bytes = response.into_body().collect().await.expect("collect body").to_bytes();
    let lines: Vec<JsonValue> = std::str::from_utf8(&bytes)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["type"], "header");
    assert_eq!(lines[1]["key"], "a");
    assert_eq!(lines[2]["key"], "b");
    assert_eq!(lines[3], json!({"type": "summary", "entries": 2}));
}

#[tokio::test]
async fn health_check_ok() {
    let app = test_app();

    let (status, json) = json_request(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].as_str().is_some());
}

#[tokio::test]
async fn metrics_count_requests_by_route() {
    let app = test_app();
    json_request(&app, get("/health")).await;
    json_request(&app, post_entries("/entries", json!([{"key": "counted"}]))).await;

    let response = app.clone().oneshot(get("/metrics")).await.expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .expect("content type");
    assert!(content_type.starts_with("text/plain"));

    let bytes = response.into_body().collect().await.expect("collect body").to_bytes();
    let text = std::str::from_utf8(&bytes).expect("utf8");
    assert!(text.contains("twowaykv_http_requests_total"), "{text}");
    assert!(text.contains("path=\"/health\""), "{text}");
    assert!(text.contains("path=\"/entries\""), "{text}");
    assert!(text.contains("twowaykv_http_request_duration_seconds_bucket"), "{text}");
}

#[tokio::test]
async fn persistent_index_survives_router_rebuild() {
    let dir = tempfile::tempdir().expect("tempdir");

    let created = {
        let index = IndexBuilder::new().path(dir.path()).open().expect("open");
        let app = build_router(AppState::new(index));
        let (_, json) =
            json_request(&app, post_entries("/entries", json!([{"key": "durable"}]))).await;
        json["entries"].clone()
    };

    let index = IndexBuilder::new().path(dir.path()).open().expect("reopen");
    let app = build_router(AppState::new(index));
    let (_, json) = json_request(&app, post_entries("/entries", json!([{"key": "durable"}]))).await;
    assert_eq!(json["entries"], created);
}
