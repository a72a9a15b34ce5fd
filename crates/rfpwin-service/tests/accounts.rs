//! Account endpoint tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn create_account_defaults_to_free() {
    let harness = TestHarness::new();
    let (name, value) = TestHarness::service_key();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({ "email": "Founder@Acme.io" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["email"], "founder@acme.io");
    assert_eq!(body["plan_type"], "free");
    assert_eq!(body["quota"], 3);
    assert_eq!(body["used"], 0);
    assert_eq!(body["remaining"], 3);
}

#[tokio::test]
async fn create_account_with_unknown_plan_gets_free_quota() {
    let harness = TestHarness::new();
    let (name, value) = TestHarness::service_key();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({ "email": "a@acme.io", "plan": "platinum" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan_type"], "free");
    assert_eq!(body["quota"], 3);
}

#[tokio::test]
async fn duplicate_account_conflicts() {
    let harness = TestHarness::new();

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let (name, value) = TestHarness::service_key();
        harness
            .server
            .post("/v1/accounts")
            .add_header(name, value)
            .json(&json!({ "email": "dup@acme.io", "plan": "pro" }))
            .await
            .assert_status(expected);
    }
}

#[tokio::test]
async fn get_account_round_trip() {
    let harness = TestHarness::new();
    harness.set_plan("pm@acme.io", "pro").await.assert_status_ok();

    let (name, value) = TestHarness::service_key();
    let response = harness
        .server
        .get("/v1/accounts/pm@acme.io")
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan_type"], "pro");
    assert_eq!(body["quota"], 250);
}

#[tokio::test]
async fn get_missing_account_is_404() {
    let harness = TestHarness::new();
    let (name, value) = TestHarness::service_key();

    let response = harness
        .server
        .get("/v1/accounts/nobody@acme.io")
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let harness = TestHarness::new();
    let (name, value) = TestHarness::service_key();

    harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({ "email": "not-an-email" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accounts_require_service_key() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/accounts")
        .json(&json!({ "email": "a@acme.io" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    harness
        .server
        .get("/v1/accounts/a@acme.io")
        .add_header(
            axum::http::HeaderName::from_static("x-api-key"),
            axum::http::HeaderValue::from_static("wrong-key"),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
