//! Admin handlers: monthly reset, plan fixes and account listing.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use rfpwin_core::PlanType;

use super::accounts::AccountResponse;
use super::{parse_email, PageQuery};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::metering::{ResetSummary, SubscriptionInfo};
use crate::state::AppState;

/// Shown as `next_reset`; nothing schedules resets.
const NEXT_RESET: &str = "manual trigger required";

/// Reset status response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetStatus {
    /// The most recent reset.
    pub last_reset: Option<ResetSummary>,
    /// When the next reset will happen.
    pub next_reset: String,
}

/// Zero every account's usage counter.
pub async fn reset_usage(
    State(state): State<Arc<AppState>>,
    auth: AdminAuth,
) -> Result<Json<ResetSummary>, ApiError> {
    tracing::info!(admin_id = %auth.admin_id, "Monthly usage reset requested");
    Ok(Json(state.meter.reset_all_usage().await?))
}

/// Report the last reset.
pub async fn reset_status(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<ResetStatus>, ApiError> {
    Ok(Json(ResetStatus {
        last_reset: state.meter.last_reset().await?,
        next_reset: NEXT_RESET.to_string(),
    }))
}

/// Manual plan change request.
#[derive(Debug, Deserialize)]
pub struct SetPlanRequest {
    /// Account email.
    pub email: String,
    /// Plan identifier.
    pub plan: String,
}

/// Move an account to a plan (catalog quota, usage reset).
pub async fn set_plan(
    State(state): State<Arc<AppState>>,
    auth: AdminAuth,
    Json(body): Json<SetPlanRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let email = parse_email(&body.email)?;
    let plan = PlanType::from_id(&body.plan);

    let account = state
        .meter
        .apply_plan(&email, plan, SubscriptionInfo::default())
        .await?;

    tracing::info!(admin_id = %auth.admin_id, email = %email, plan = %plan, "Plan set by admin");
    Ok(Json(AccountResponse::from(&account)))
}

/// List accounts, newest first.
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = state
        .store
        .list_accounts(page.limit(), page.offset())
        .await?;
    Ok(Json(accounts.iter().map(AccountResponse::from).collect()))
}
