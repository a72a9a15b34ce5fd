//! Request and response types for the metering client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rfpwin_core::{ActionKind, PlanType};

/// Gate request body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CheckRequest<'a> {
    pub account_id: &'a str,
    pub action: ActionKind,
}

/// Recorder request body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LogRequest<'a> {
    pub account_id: &'a str,
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Outcome of recording one billable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UsageRecord {
    /// Whether the unit was persisted. `false` only under best-effort metering.
    pub success: bool,
    /// Counter after the increment.
    pub used: i64,
    /// Units left after the increment.
    pub remaining: i64,
    /// The account's quota.
    pub limit: i64,
}

/// An account's usage numbers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UsageSummary {
    /// Account email.
    pub email: String,
    /// Units consumed this period.
    pub used: i64,
    /// Monthly quota.
    pub limit: i64,
    /// Units left.
    pub remaining: i64,
    /// Current plan.
    pub plan_type: PlanType,
    /// Subscription status.
    pub subscription_status: String,
}

/// Outcome of a monthly reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ResetSummary {
    /// Accounts whose counter was zeroed.
    pub accounts_updated: u64,
    /// When the reset ran.
    pub reset_at: DateTime<Utc>,
}

/// API error response format.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// `details` of a `quota_exceeded` error.
#[derive(Debug, Deserialize)]
pub(crate) struct QuotaDetails {
    pub remaining: i64,
    pub limit: i64,
    pub plan_type: PlanType,
}
