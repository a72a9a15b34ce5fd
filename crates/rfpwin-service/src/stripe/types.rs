//! Stripe API and webhook payload types.
//!
//! Only the fields the metering service reads are modelled.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event ID.
    pub id: String,
    /// Event type (`checkout.session.completed`, ...).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: EventData,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event is about.
    pub object: serde_json::Value,
}

/// A completed Checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID.
    pub id: String,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Subscription created by the session.
    #[serde(default)]
    pub subscription: Option<String>,
    /// Amount charged in cents.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Details the customer entered.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Fallback email field on older sessions.
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl CheckoutSession {
    /// The paying customer's email, if Stripe sent one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }
}

/// Customer details captured at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    /// Customer email.
    #[serde(default)]
    pub email: Option<String>,
}

/// A Stripe subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// Subscription ID.
    pub id: String,
    /// Status (`active`, `past_due`, `canceled`, ...).
    pub status: String,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Period start (unix seconds).
    #[serde(default)]
    pub current_period_start: Option<i64>,
    /// Period end (unix seconds).
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

impl Subscription {
    /// Period start as a timestamp.
    #[must_use]
    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        self.current_period_start
            .and_then(|s| DateTime::from_timestamp(s, 0))
    }

    /// Period end as a timestamp.
    #[must_use]
    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .and_then(|s| DateTime::from_timestamp(s, 0))
    }
}

/// Stripe error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    pub message: String,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}
