//! Health and catalog endpoint tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_check_returns_ok() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "rfpwin-metering");
}

#[tokio::test]
async fn health_check_reports_degraded_store() {
    let harness = TestHarness::new();
    harness.store.fail_reads(true);

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn plan_catalog_is_public() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/plans").await;

    response.assert_status_ok();
    let plans: Vec<serde_json::Value> = response.json();
    let quotas: Vec<(String, i64)> = plans
        .iter()
        .map(|p| {
            (
                p["plan"].as_str().unwrap().to_string(),
                p["quota"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        quotas,
        vec![
            ("free".to_string(), 3),
            ("basic".to_string(), 25),
            ("pro".to_string(), 250),
            ("enterprise".to_string(), 5000),
        ]
    );
}
