//! Stripe API client implementation.

use std::time::Duration;

use reqwest::Client;

use super::types::{StripeErrorResponse, Subscription};
use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Maximum age of a signed webhook, in seconds.
const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Invalid webhook signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, StripeError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Point the client at another API host (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch a subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Stripe rejects it.
    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, StripeError> {
        let response = self
            .client
            .get(format!("{}/subscriptions/{subscription_id}", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// Header format: `t=timestamp,v1=signature[,v1=signature2...]`. The signed
/// message is `"{t}.{body}"`. Signatures older than five minutes are rejected.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` when no `v1` signature matches or
/// the timestamp is missing or stale.
pub fn verify_signature(secret: &str, payload: &str, header: &str) -> Result<(), StripeError> {
    verify_signature_at(secret, payload, header, chrono::Utc::now().timestamp())
}

fn verify_signature_at(
    secret: &str,
    payload: &str,
    header: &str,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", ts)) => timestamp = Some(ts),
            Some(("v1", sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;
    let issued_at: i64 = timestamp.parse().map_err(|_| StripeError::InvalidSignature)?;
    let age = now
        .checked_sub(issued_at)
        .map(i64::unsigned_abs)
        .ok_or(StripeError::InvalidSignature)?;
    if age > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature);
    }

    let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
    if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::crypto::stripe_signature_header;

    const SECRET: &str = "whsec_test";

    #[test]
    fn valid_signature() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = stripe_signature_header(SECRET, 1_700_000_000, payload);
        assert!(verify_signature_at(SECRET, payload, &header, 1_700_000_010).is_ok());
    }

    #[test]
    fn tampered_payload_rejected() {
        let header = stripe_signature_header(SECRET, 1_700_000_000, r#"{"id":"evt_1"}"#);
        let result = verify_signature_at(SECRET, r#"{"id":"evt_2"}"#, &header, 1_700_000_000);
        assert!(matches!(result, Err(StripeError::InvalidSignature)));
    }

    #[test]
    fn stale_signature_rejected() {
        let header = stripe_signature_header(SECRET, 1_700_000_000, "{}");
        let result = verify_signature_at(SECRET, "{}", &header, 1_700_000_000 + 301);
        assert!(matches!(result, Err(StripeError::InvalidSignature)));
    }

    #[test]
    fn extreme_timestamps_rejected() {
        for ts in [i64::MIN, i64::MAX, -1] {
            let header = format!("t={ts},v1=aa");
            let result = verify_signature_at(SECRET, "{}", &header, 1_700_000_000);
            assert!(matches!(result, Err(StripeError::InvalidSignature)));
        }

        let header = stripe_signature_header(SECRET, 1_700_000_000, "{}");
        let result = verify_signature_at(SECRET, "{}", &header, i64::MIN);
        assert!(matches!(result, Err(StripeError::InvalidSignature)));
    }

    #[test]
    fn any_matching_v1_accepted() {
        let good = stripe_signature_header(SECRET, 1_700_000_000, "{}");
        let sig = good.split_once("v1=").unwrap().1;
        let header = format!("t=1700000000,v1=deadbeef,v1={sig}");
        assert!(verify_signature_at(SECRET, "{}", &header, 1_700_000_000).is_ok());
    }

    #[test]
    fn missing_timestamp_rejected() {
        let result = verify_signature_at(SECRET, "{}", "v1=abc", 0);
        assert!(matches!(result, Err(StripeError::InvalidSignature)));
    }

    #[tokio::test]
    async fn get_subscription_parses_period() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/sub_1"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "sub_1",
                "status": "active",
                "customer": "cus_1",
                "current_period_start": 1_700_000_000,
                "current_period_end": 1_702_592_000
            })))
            .mount(&server)
            .await;

        let client = StripeClient::new("sk_test").unwrap().with_base_url(server.uri());
        let sub = client.get_subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, "active");
        assert_eq!(sub.period_end().unwrap().timestamp(), 1_702_592_000);
    }

    #[tokio::test]
    async fn api_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/sub_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {
                    "type": "invalid_request_error",
                    "message": "No such subscription",
                    "code": "resource_missing"
                }
            })))
            .mount(&server)
            .await;

        let client = StripeClient::new("sk_test").unwrap().with_base_url(server.uri());
        let err = client.get_subscription("sub_missing").await.unwrap_err();
        assert!(matches!(
            err,
            StripeError::Api { ref code, .. } if code.as_deref() == Some("resource_missing")
        ));
    }
}
