//! API Integration Tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use owner_ledger::api;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, caller: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(caller) = caller {
        builder = builder.header("X-Caller-Id", caller);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn setup_app(initial: u128) -> (Router, Uuid) {
    let ledger = common::setup_ledger(initial).await;
    (api::build_router(ledger.ledger), ledger.owner)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup_app(0).await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ledger_e2e() {
    let (app, owner) = setup_app(100).await;
    let owner = owner.to_string();

    // 1. Balance is public
    let response = app.clone().oneshot(get("/api/v1/balance")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["balance"], "100");

    // 2. Deposit
    let response = app
        .clone()
        .oneshot(post("/api/v1/deposit", Some(&owner), json!({"amount": "50"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "Deposit failed");
    let json = body_json(response).await;
    assert_eq!(json["balance"], "150");
    assert_eq!(json["event_type"], "Deposit");
    assert_eq!(json["version"], 2);

    // 3. Overdraw
    let response = app
        .clone()
        .oneshot(post("/api/v1/withdraw", Some(&owner), json!({"amount": "200"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "insufficient_balance");

    // 4. Withdraw everything
    let response = app
        .clone()
        .oneshot(post("/api/v1/withdraw", Some(&owner), json!({"amount": "150"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "Withdraw failed");
    assert_eq!(body_json(response).await["balance"], "0");

    // 5. Account view
    let response = app.clone().oneshot(get("/api/v1/account")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["owner"], owner.as_str());
    assert_eq!(json["version"], 3);
    assert!(json["created_at"].is_string());

    // 6. Event history
    let response = app
        .clone()
        .oneshot(get("/api/v1/events?after_version=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 3);
    let types: Vec<&str> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["Deposit", "Withdraw"]);
}

#[tokio::test]
async fn test_stranger_is_forbidden() {
    let (app, _) = setup_app(10).await;
    let stranger = Uuid::new_v4().to_string();

    let response = app
        .clone()
        .oneshot(post("/api/v1/deposit", Some(&stranger), json!({"amount": "1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error_code"], "unauthorized");

    // Malformed amounts from a stranger are still an authorization failure
    let response = app
        .clone()
        .oneshot(post("/api/v1/withdraw", Some(&stranger), json!({"amount": "0"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error_code"], "unauthorized");

    let response = app.oneshot(get("/api/v1/balance")).await.unwrap();
    assert_eq!(body_json(response).await["balance"], "10");
}

#[tokio::test]
async fn test_caller_header_validation() {
    let (app, _) = setup_app(10).await;

    let response = app
        .clone()
        .oneshot(post("/api/v1/withdraw", None, json!({"amount": "1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "missing_header");

    let response = app
        .oneshot(post("/api/v1/withdraw", Some("not-a-uuid"), json!({"amount": "1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "invalid_caller_id");
}

#[tokio::test]
async fn test_invalid_amounts_rejected() {
    let (app, owner) = setup_app(10).await;
    let owner = owner.to_string();

    for amount in ["0", "-5", "1.5", "ten"] {
        let response = app
            .clone()
            .oneshot(post("/api/v1/deposit", Some(&owner), json!({"amount": amount})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "amount {}", amount);
        assert_eq!(body_json(response).await["error_code"], "invalid_amount");
    }
}

#[tokio::test]
async fn test_burn_resets_balance() {
    let (app, owner) = setup_app(42).await;

    let response = app
        .clone()
        .oneshot(post("/api/v1/burn", Some(&owner.to_string()), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["event_type"], "Burn");
    assert_eq!(json["balance"], "0");
}
