//! Metering service HTTP client implementation.

use reqwest::{Client, RequestBuilder, Url};
use std::time::Duration;

use rfpwin_core::{ActionKind, PlanInfo, UsageCheck};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, CheckRequest, LogRequest, QuotaDetails, ResetSummary, UsageRecord,
    UsageSummary,
};

/// Metering API client.
///
/// Collaborator services call [`check_usage_limit`](Self::check_usage_limit)
/// before a billable action and [`log_usage`](Self::log_usage) after it
/// succeeds.
#[derive(Debug, Clone)]
pub struct MeteringClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
    admin_key: Option<String>,
}

impl MeteringClient {
    /// Create a new metering client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the metering service (e.g., `"http://rfpwin-metering:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new metering client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
            admin_key: options.admin_key,
        })
    }

    /// Ask whether `email` may perform one more billable action.
    ///
    /// Treat any error as a denial.
    ///
    /// # Errors
    ///
    /// `ClientError::Unavailable` when the service could not read the
    /// account, plus transport and API errors.
    pub async fn check_usage_limit(
        &self,
        email: &str,
        action: ActionKind,
    ) -> Result<UsageCheck, ClientError> {
        let request = CheckRequest {
            account_id: email,
            action,
        };
        let builder = self
            .service_request(self.client.post(self.url("/v1/usage/check")))
            .json(&request);
        self.send(builder).await
    }

    /// Record one billable unit after the action succeeded.
    ///
    /// # Errors
    ///
    /// `ClientError::AccountNotFound` when the account does not exist, plus
    /// transport and API errors.
    pub async fn log_usage(
        &self,
        email: &str,
        action: ActionKind,
        metadata: Option<serde_json::Value>,
    ) -> Result<UsageRecord, ClientError> {
        let request = LogRequest {
            account_id: email,
            action,
            metadata,
        };
        let builder = self
            .service_request(self.client.post(self.url("/v1/usage/log")))
            .json(&request);
        self.send(builder).await
    }

    /// Check and record in one call.
    ///
    /// # Errors
    ///
    /// `ClientError::QuotaExceeded` when the account has no units left.
    pub async fn track_usage(
        &self,
        email: &str,
        action: ActionKind,
        metadata: Option<serde_json::Value>,
    ) -> Result<UsageRecord, ClientError> {
        let request = LogRequest {
            account_id: email,
            action,
            metadata,
        };
        let builder = self
            .service_request(self.client.post(self.url("/v1/usage/track")))
            .json(&request);
        self.send(builder).await
    }

    /// Get an account's current usage numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_usage(&self, email: &str) -> Result<UsageSummary, ClientError> {
        let url = self.segment_url(&["v1", "usage", email])?;
        let builder = self.service_request(self.client.get(url));
        self.send(builder).await
    }

    /// Zero every account's usage counter. Needs an admin key.
    ///
    /// # Errors
    ///
    /// `ClientError::Configuration` when no admin key was configured.
    pub async fn reset_all_usage(&self) -> Result<ResetSummary, ClientError> {
        let admin_key = self.admin_key.as_deref().ok_or_else(|| {
            ClientError::Configuration("admin key required for usage reset".into())
        })?;

        let builder = self
            .client
            .post(self.url("/v1/admin/usage/reset"))
            .header("x-admin-key", admin_key)
            .header("x-admin-id", &self.service_name);
        let summary: ResetSummary = self.send(builder).await?;

        tracing::info!(
            accounts_updated = summary.accounts_updated,
            "Monthly usage reset triggered"
        );
        Ok(summary)
    }

    /// List the plan catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_plans(&self) -> Result<Vec<PlanInfo>, ClientError> {
        self.send(self.client.get(self.url("/v1/plans"))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Append percent-encoded path segments to the base URL.
    fn segment_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Configuration("base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn service_request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = builder.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        let Ok(api_error) = error_body else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };

        let code = api_error.error.code;
        let message = api_error.error.message;

        match code.as_str() {
            "quota_exceeded" => {
                let details: Option<QuotaDetails> = api_error
                    .error
                    .details
                    .and_then(|d| serde_json::from_value(d).ok());
                match details {
                    Some(d) => Err(ClientError::QuotaExceeded {
                        remaining: d.remaining,
                        limit: d.limit,
                        plan_type: d.plan_type,
                    }),
                    None => Err(ClientError::Api {
                        code,
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            "metering_unavailable" => Err(ClientError::Unavailable),
            "unauthorized" => Err(ClientError::Unauthorized),
            "not_found" if message.starts_with("account not found") => {
                Err(ClientError::AccountNotFound {
                    email: message.trim_start_matches("account not found: ").to_string(),
                })
            }
            _ => Err(ClientError::Api {
                code,
                message,
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
    /// Admin key for reset calls (optional).
    pub admin_key: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
            admin_key: None,
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use rfpwin_core::PlanType;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const EMAIL: &str = "founder@acme.io";

    fn client_for(server: &MockServer) -> MeteringClient {
        MeteringClient::with_options(
            server.uri(),
            "svc-key",
            ClientOptions {
                admin_key: Some("admin-key".into()),
                ..ClientOptions::with_service_name("rfp-analyzer")
            },
        )
        .unwrap()
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = MeteringClient::new("http://localhost:8080/", "test-api-key").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_options() {
        let options = ClientOptions::with_service_name("proposal-writer");
        let client = MeteringClient::with_options("http://localhost:8080", "key", options).unwrap();
        assert_eq!(client.service_name, "proposal-writer");
        assert!(client.admin_key.is_none());
    }

    #[tokio::test]
    async fn check_sends_service_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage/check"))
            .and(header("x-api-key", "svc-key"))
            .and(header("x-service-name", "rfp-analyzer"))
            .and(body_json(json!({ "account_id": EMAIL, "action": "rfp_analysis" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "allowed": true,
                "remaining": 2,
                "limit": 3,
                "plan_type": "free"
            })))
            .mount(&server)
            .await;

        let check = client_for(&server)
            .check_usage_limit(EMAIL, ActionKind::RfpAnalysis)
            .await
            .unwrap();

        assert!(check.allowed);
        assert_eq!(check.remaining, 2);
        assert_eq!(check.plan_type, PlanType::Free);
        assert!(!check.degraded);
    }

    #[tokio::test]
    async fn log_returns_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage/log"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "used": 25,
                "remaining": 0,
                "limit": 25
            })))
            .mount(&server)
            .await;

        let record = client_for(&server)
            .log_usage(EMAIL, ActionKind::ProposalGeneration, Some(json!({ "doc": "rfp-7" })))
            .await
            .unwrap();

        assert!(record.success);
        assert_eq!(record.used, 25);
        assert_eq!(record.remaining, 0);
    }

    #[tokio::test]
    async fn quota_exceeded_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage/track"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": "quota_exceeded",
                    "message": "Usage limit reached. Upgrade your plan to continue.",
                    "details": { "remaining": 0, "limit": 25, "plan_type": "basic" }
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .track_usage(EMAIL, ActionKind::RfpAnalysis, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::QuotaExceeded {
                remaining: 0,
                limit: 25,
                plan_type: PlanType::Basic
            }
        ));
    }

    #[tokio::test]
    async fn unavailable_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage/check"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": "metering_unavailable", "message": "retry later" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .check_usage_limit(EMAIL, ActionKind::RfpAnalysis)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Unavailable));
    }

    #[tokio::test]
    async fn missing_account_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage/log"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "not_found", "message": "account not found: ghost@acme.io" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .log_usage("ghost@acme.io", ActionKind::RfpAnalysis, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::AccountNotFound { ref email } if email == "ghost@acme.io"));
    }

    #[tokio::test]
    async fn non_json_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/usage/{EMAIL}")))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_usage(EMAIL).await.unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn get_usage_encodes_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/usage/team%231@acme.io"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "team#1@acme.io",
                "used": 4,
                "limit": 25,
                "remaining": 21,
                "plan_type": "basic",
                "subscription_status": "active"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client_for(&server).get_usage("team#1@acme.io").await.unwrap();

        assert_eq!(summary.remaining, 21);
        assert_eq!(summary.plan_type, PlanType::Basic);
    }

    #[test]
    fn segment_url_keeps_base_path() {
        let client = MeteringClient::new("http://metering:8080/api/", "key").unwrap();
        let url = client.segment_url(&["v1", "usage", "a?b@acme.io"]).unwrap();
        assert_eq!(url.as_str(), "http://metering:8080/api/v1/usage/a%3Fb@acme.io");
    }

    #[tokio::test]
    async fn reset_uses_admin_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/admin/usage/reset"))
            .and(header("x-admin-key", "admin-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accounts_updated": 12,
                "reset_at": "2026-10-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client_for(&server).reset_all_usage().await.unwrap();

        assert_eq!(summary.accounts_updated, 12);
    }

    #[tokio::test]
    async fn reset_without_admin_key_fails_locally() {
        let client = MeteringClient::new("http://localhost:1", "svc-key").unwrap();

        let err = client.reset_all_usage().await.unwrap_err();

        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[tokio::test]
    async fn list_plans() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/plans"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "plan": "free", "quota": 3 },
                { "plan": "basic", "quota": 25 }
            ])))
            .mount(&server)
            .await;

        let plans = client_for(&server).list_plans().await.unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[1].plan, PlanType::Basic);
        assert_eq!(plans[1].quota, 25);
    }
}
