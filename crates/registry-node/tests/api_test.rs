//! Integration tests for the Registry Node API

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use provenance_common::{Address, ContentHash};
use registry_node::{create_router, AppState, FixedClock, MemoryStore, Registry, CALLER_HEADER};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const OWNER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
const RELAYER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
const USER: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";

async fn create_test_app() -> axum::Router {
    let registry = Registry::deploy(
        Arc::new(MemoryStore::new()),
        Address::parse(OWNER).unwrap(),
        Arc::new(FixedClock(1_761_000_000)),
    )
    .await
    .unwrap();

    create_router(AppState { registry })
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, caller: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json");
    if let Some(caller) = caller {
        builder = builder.header(CALLER_HEADER, caller);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn role_change(method: &str, uri: &str, caller: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header(CALLER_HEADER, caller)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "registry-node");
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_register_then_lookup() {
    let app = create_test_app().await;
    let hash = ContentHash::keccak256(b"test-data").to_hex();

    let (status, json) = send(
        &app,
        post_json(
            "/api/registrations",
            Some(USER),
            json!({"hash": hash, "ipfsCid": "QmTest123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["sequence"], 1);
    assert_eq!(json["event"]["reporter"], USER);
    assert_eq!(json["event"]["timestamp"], 1_761_000_000u64);
    assert!(json["txHash"].as_str().unwrap().starts_with("0x"));

    let (status, json) = send(&app, get(&format!("/api/registrations/{}", hash))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exists"], true);
    assert_eq!(json["reporter"], USER);
    assert_eq!(json["ipfsCid"], "QmTest123");

    let (_, json) = send(&app, get(&format!("/api/registrations/{}/exists", hash))).await;
    assert_eq!(json["registered"], true);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = create_test_app().await;
    let body = json!({"hash": ContentHash::keccak256(b"test-data"), "ipfsCid": "QmTest123"});

    let (status, _) = send(&app, post_json("/api/registrations", Some(USER), body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, post_json("/api/registrations", Some(USER), body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().unwrap().contains("already registered"));
}

#[tokio::test]
async fn test_unknown_hash_returns_zero_registration() {
    let app = create_test_app().await;
    let hash = ContentHash::keccak256(b"unregistered").to_hex();

    let (status, json) = send(&app, get(&format!("/api/registrations/{}", hash))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exists"], false);
    assert_eq!(json["timestamp"], 0);
    assert_eq!(json["reporter"], "0x0000000000000000000000000000000000000000");

    let (_, json) = send(&app, get(&format!("/api/registrations/{}/exists", hash))).await;
    assert_eq!(json["registered"], false);
}

#[tokio::test]
async fn test_malformed_hash_is_bad_request() {
    let app = create_test_app().await;
    let (status, json) = send(&app, get("/api/registrations/0x1234")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
}

#[tokio::test]
async fn test_missing_caller_is_bad_request() {
    let app = create_test_app().await;
    let (status, json) = send(
        &app,
        post_json(
            "/api/registrations",
            None,
            json!({"hash": ContentHash::keccak256(b"x")}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains(CALLER_HEADER));
}

#[tokio::test]
async fn test_relayed_registration_requires_role() {
    let app = create_test_app().await;
    let body = json!({
        "hash": ContentHash::keccak256(b"relayer-test"),
        "reporter": USER,
        "ipfsCid": "QmRelayer123"
    });

    let (status, json) = send(
        &app,
        post_json("/api/registrations/relayed", Some(RELAYER), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["ok"], false);

    let (status, json) = send(
        &app,
        role_change("PUT", &format!("/api/roles/relayer/{}", RELAYER), OWNER),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);

    let (status, json) = send(
        &app,
        post_json("/api/registrations/relayed", Some(RELAYER), body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event"]["reporter"], USER);
}

#[tokio::test]
async fn test_role_management_is_admin_only() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        role_change("PUT", &format!("/api/roles/relayer/{}", USER), RELAYER),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, json) = send(&app, get(&format!("/api/roles/relayer/{}", OWNER))).await;
    assert_eq!(json["hasRole"], true);

    let (status, json) = send(
        &app,
        role_change("DELETE", &format!("/api/roles/relayer/{}", OWNER), OWNER),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);

    let (_, json) = send(&app, get("/api/roles/relayer")).await;
    assert_eq!(json["total"], 0);

    let (_, json) = send(&app, get("/api/roles/admin")).await;
    assert_eq!(json["members"], json!([OWNER]));
}

#[tokio::test]
async fn test_unknown_role_is_bad_request() {
    let app = create_test_app().await;
    let (status, _) = send(&app, get(&format!("/api/roles/owner/{}", OWNER))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn post_raw(uri: &str, caller: &str, body: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .header(CALLER_HEADER, caller)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_malformed_bodies_keep_error_shape() {
    let app = create_test_app().await;
    let relayed_body = format!(
        r#"{{"hash":"{}","reporter":"0x1234"}}"#,
        ContentHash::keccak256(b"x")
    );

    let cases = [
        ("/api/registrations", r#"{"hash":"0x1234"}"#.to_string()),
        ("/api/registrations", r#"{"ipfsCid":"QmNoHash"}"#.to_string()),
        ("/api/registrations", "{not json".to_string()),
        ("/api/registrations/relayed", relayed_body),
    ];

    for (uri, body) in cases {
        let (status, json) = send(&app, post_raw(uri, OWNER, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", uri, body);
        assert_eq!(json["ok"], false, "{} {}", uri, body);
        assert!(json["error"].as_str().unwrap().starts_with("Invalid request body"));
    }
}

#[tokio::test]
async fn test_event_log_pages_in_commit_order() {
    let app = create_test_app().await;
    let hashes: Vec<String> = (0..3u8)
        .map(|i| ContentHash::keccak256([i]).to_hex())
        .collect();

    for hash in &hashes {
        let (status, _) = send(
            &app,
            post_json("/api/registrations", Some(USER), json!({"hash": hash})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    // Duplicates never reach the log
    send(
        &app,
        post_json("/api/registrations", Some(USER), json!({"hash": hashes[0]})),
    )
    .await;

    let (status, json) = send(&app, get("/api/events")).await;
    assert_eq!(status, StatusCode::OK);
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    for (i, receipt) in events.iter().enumerate() {
        assert_eq!(receipt["sequence"], i as u64 + 1);
        assert_eq!(receipt["event"]["hash"], hashes[i].as_str());
    }
    assert_eq!(json["next"], 4);

    let (_, json) = send(&app, get("/api/events?from=2&limit=1")).await;
    assert_eq!(json["events"].as_array().unwrap().len(), 1);
    assert_eq!(json["events"][0]["event"]["hash"], hashes[1].as_str());
    assert_eq!(json["next"], 3);

    let (_, json) = send(&app, get("/api/events?from=4")).await;
    assert!(json["events"].as_array().unwrap().is_empty());
    assert_eq!(json["next"], 4);

    let (status, json) = send(&app, get("/api/events?from=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
}
