//! Admin endpoint tests: reset, plan fixes and listings.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn reset_zeroes_every_account() {
    let harness = TestHarness::new();
    for email in ["a@acme.io", "b@acme.io", "c@acme.io"] {
        harness.track(email, "rfp_analysis").await.assert_status_ok();
    }

    let response = harness.reset().await;

    response.assert_status_ok();
    let summary: serde_json::Value = response.json();
    assert_eq!(summary["accounts_updated"], 3);

    for email in ["a@acme.io", "b@acme.io", "c@acme.io"] {
        let body: serde_json::Value = harness.check(email, "rfp_analysis").await.json();
        assert_eq!(body["remaining"], 3);
    }
}

#[tokio::test]
async fn reset_status_reports_last_reset() {
    let harness = TestHarness::new();
    let (name, value) = TestHarness::admin_key();

    let before: serde_json::Value = harness
        .server
        .get("/v1/admin/usage/reset")
        .add_header(name.clone(), value.clone())
        .await
        .json();
    assert!(before["last_reset"].is_null());
    assert_eq!(before["next_reset"], "manual trigger required");

    harness.reset().await.assert_status_ok();

    let after: serde_json::Value = harness
        .server
        .get("/v1/admin/usage/reset")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(after["last_reset"]["accounts_updated"], 0);
}

#[tokio::test]
async fn reset_failure_is_500() {
    let harness = TestHarness::new();
    harness.store.fail_writes(true);

    harness
        .reset()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn admin_routes_require_admin_key() {
    let harness = TestHarness::new();
    let (name, value) = TestHarness::service_key();

    harness
        .server
        .post("/v1/admin/usage/reset")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    harness
        .server
        .get("/v1/admin/accounts")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn set_plan_resets_usage_and_applies_quota() {
    let harness = TestHarness::new();
    harness.track("up@acme.io", "rfp_analysis").await.assert_status_ok();
    harness.track("up@acme.io", "rfp_analysis").await.assert_status_ok();

    let response = harness.set_plan("up@acme.io", "enterprise").await;

    response.assert_status_ok();
    let account: serde_json::Value = response.json();
    assert_eq!(account["plan_type"], "enterprise");
    assert_eq!(account["quota"], 5000);
    assert_eq!(account["used"], 0);
    assert_eq!(account["remaining"], 5000);
}

#[tokio::test]
async fn set_plan_with_unknown_id_uses_free() {
    let harness = TestHarness::new();

    let account: serde_json::Value = harness.set_plan("x@acme.io", "gold").await.json();

    assert_eq!(account["plan_type"], "free");
    assert_eq!(account["quota"], 3);
}

#[tokio::test]
async fn list_accounts_paginates() {
    let harness = TestHarness::new();
    for i in 0..5 {
        harness
            .set_plan(&format!("user{i}@acme.io"), "basic")
            .await
            .assert_status_ok();
    }
    let (name, value) = TestHarness::admin_key();

    let all: Vec<serde_json::Value> = harness
        .server
        .get("/v1/admin/accounts")
        .add_header(name.clone(), value.clone())
        .await
        .json();
    assert_eq!(all.len(), 5);

    let page: Vec<serde_json::Value> = harness
        .server
        .get("/v1/admin/accounts")
        .add_query_param("limit", 2)
        .add_query_param("offset", 4)
        .add_header(name, value)
        .await
        .json();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn set_plan_rejects_bad_email() {
    let harness = TestHarness::new();
    let (name, value) = TestHarness::admin_key();

    harness
        .server
        .post("/v1/admin/plans")
        .add_header(name, value)
        .json(&json!({ "email": "nope", "plan": "pro" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
