//! Common test utilities for metering service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::json;

use rfpwin_core::{Account, CompanyProfile, Email, PlanChange, UsageLogEntry, UsageReset};
use rfpwin_service::crypto::stripe_signature_header;
use rfpwin_service::{create_router, AppState, MeteringPolicy, ServiceConfig, StripeClient};
use rfpwin_store::{MemoryStore, Result, Store, StoreError};

pub const SERVICE_API_KEY: &str = "test-service-key";
pub const ADMIN_API_KEY: &str = "test-admin-key";
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// A memory store whose reads or counter writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("connection refused".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get_account(&self, email: &Email) -> Result<Option<Account>> {
        self.check_read()?;
        self.inner.get_account(email).await
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        self.inner.insert_account(account).await
    }

    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<Account>> {
        self.check_read()?;
        self.inner.list_accounts(limit, offset).await
    }

    async fn apply_plan_change(&self, email: &Email, change: &PlanChange) -> Result<Account> {
        self.inner.apply_plan_change(email, change).await
    }

    async fn find_account_by_subscription(&self, id: &str) -> Result<Option<Account>> {
        self.check_read()?;
        self.inner.find_account_by_subscription(id).await
    }

    async fn increment_usage(&self, email: &Email) -> Result<Account> {
        self.check_write()?;
        self.inner.increment_usage(email).await
    }

    async fn reset_all_usage(&self) -> Result<UsageReset> {
        self.check_write()?;
        self.inner.reset_all_usage().await
    }

    async fn last_usage_reset(&self) -> Result<Option<UsageReset>> {
        self.inner.last_usage_reset().await
    }

    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()> {
        self.inner.append_usage_log(entry).await
    }

    async fn list_usage_logs(
        &self,
        email: &Email,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageLogEntry>> {
        self.inner.list_usage_logs(email, limit, offset).await
    }

    async fn put_company_profile(&self, profile: &CompanyProfile) -> Result<()> {
        self.inner.put_company_profile(profile).await
    }

    async fn get_company_profile(&self, id: &str) -> Result<Option<CompanyProfile>> {
        self.inner.get_company_profile(id).await
    }

    async fn ping(&self) -> Result<()> {
        self.check_read()
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server.
    pub store: Arc<FlakyStore>,
}

impl TestHarness {
    /// Create a new test harness with an empty store and mandatory metering.
    pub fn new() -> Self {
        Self::build(MeteringPolicy::default(), None)
    }

    /// Create a harness with a specific write policy.
    pub fn with_policy(policy: MeteringPolicy) -> Self {
        Self::build(policy, None)
    }

    /// Create a harness whose Stripe client talks to `base_url`.
    pub fn with_stripe(base_url: &str) -> Self {
        let client = StripeClient::new("sk_test")
            .expect("Failed to build Stripe client")
            .with_base_url(base_url);
        Self::build(MeteringPolicy::default(), Some(client))
    }

    fn build(policy: MeteringPolicy, stripe: Option<StripeClient>) -> Self {
        let store = Arc::new(FlakyStore::default());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_api_key: Some(SERVICE_API_KEY.into()),
            admin_api_key: Some(ADMIN_API_KEY.into()),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            metering: policy,
            ..ServiceConfig::default()
        };

        let mut state = AppState::new(store.clone(), config);
        if let Some(client) = stripe {
            state = state.with_stripe(client);
        }
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    pub fn service_key() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static(SERVICE_API_KEY),
        )
    }

    pub fn admin_key() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-admin-key"),
            HeaderValue::from_static(ADMIN_API_KEY),
        )
    }

    /// `Stripe-Signature` header for `payload`, signed now.
    pub fn stripe_signature(payload: &str) -> (HeaderName, HeaderValue) {
        let header = stripe_signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), payload);
        (
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_str(&header).expect("valid header value"),
        )
    }

    pub async fn check(&self, email: &str, action: &str) -> TestResponse {
        let (name, value) = Self::service_key();
        self.server
            .post("/v1/usage/check")
            .add_header(name, value)
            .json(&json!({ "account_id": email, "action": action }))
            .await
    }

    pub async fn log(&self, email: &str, action: &str) -> TestResponse {
        let (name, value) = Self::service_key();
        self.server
            .post("/v1/usage/log")
            .add_header(name, value)
            .json(&json!({ "account_id": email, "action": action, "metadata": { "file": "rfp.pdf" } }))
            .await
    }

    pub async fn track(&self, email: &str, action: &str) -> TestResponse {
        let (name, value) = Self::service_key();
        self.server
            .post("/v1/usage/track")
            .add_header(name, value)
            .json(&json!({ "account_id": email, "action": action }))
            .await
    }

    pub async fn set_plan(&self, email: &str, plan: &str) -> TestResponse {
        let (name, value) = Self::admin_key();
        self.server
            .post("/v1/admin/plans")
            .add_header(name, value)
            .json(&json!({ "email": email, "plan": plan }))
            .await
    }

    pub async fn reset(&self) -> TestResponse {
        let (name, value) = Self::admin_key();
        self.server
            .post("/v1/admin/usage/reset")
            .add_header(name, value)
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
