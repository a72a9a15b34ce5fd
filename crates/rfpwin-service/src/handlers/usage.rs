//! Usage handlers: the gate, the recorder, and per-account usage views.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use rfpwin_core::{ActionKind, UsageCheck, UsageLogEntry};

use super::{parse_email, PageQuery};
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::metering::{UsageRecord, UsageSummary};
use crate::state::AppState;

/// Gate request.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Account email.
    pub account_id: String,
    /// The action about to run.
    pub action: ActionKind,
}

/// Recorder request.
#[derive(Debug, Deserialize)]
pub struct LogRequest {
    /// Account email.
    pub account_id: String,
    /// The action that ran.
    pub action: ActionKind,
    /// Free-form context stored on the audit row.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Ask whether an action may proceed.
///
/// Returns `503 metering_unavailable` when the account could not be read.
pub async fn check_usage(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<CheckRequest>,
) -> Result<Json<UsageCheck>, ApiError> {
    let email = parse_email(&body.account_id)?;
    let check = state.meter.check_usage_limit(&email, body.action).await;

    if check.degraded {
        tracing::warn!(service = %auth.service_name, email = %email, "Usage check degraded");
        return Err(ApiError::MeteringUnavailable);
    }
    Ok(Json(check))
}

/// Record one billable unit.
pub async fn log_usage(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<LogRequest>,
) -> Result<Json<UsageRecord>, ApiError> {
    let email = parse_email(&body.account_id)?;
    tracing::debug!(service = %auth.service_name, email = %email, action = %body.action, "Recording usage");

    let record = state.meter.record(&email, body.action, body.metadata).await?;
    Ok(Json(record))
}

/// Gate and record in one call.
///
/// Returns `429 quota_exceeded` when the account has no units left.
pub async fn track_usage(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<LogRequest>,
) -> Result<Json<UsageRecord>, ApiError> {
    let email = parse_email(&body.account_id)?;
    tracing::debug!(service = %auth.service_name, email = %email, action = %body.action, "Tracking usage");

    let record = state.meter.track(&email, body.action, body.metadata).await?;
    Ok(Json(record))
}

/// Current usage numbers for an account.
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(email): Path<String>,
) -> Result<Json<UsageSummary>, ApiError> {
    let email = parse_email(&email)?;
    Ok(Json(state.meter.usage_summary(&email).await?))
}

/// An account's audit rows, newest first.
pub async fn list_usage_logs(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(email): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<UsageLogEntry>>, ApiError> {
    let email = parse_email(&email)?;
    let logs = state
        .store
        .list_usage_logs(&email, page.limit(), page.offset())
        .await?;
    Ok(Json(logs))
}
