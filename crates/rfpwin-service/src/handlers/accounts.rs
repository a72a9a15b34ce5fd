//! Account handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rfpwin_core::{Account, PlanType};

use super::parse_email;
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    /// Account email.
    pub email: String,
    /// Current plan.
    pub plan_type: PlanType,
    /// Monthly quota.
    pub quota: i64,
    /// Units consumed this period.
    pub used: i64,
    /// Units left this period.
    pub remaining: i64,
    /// Subscription status mirrored from Stripe.
    pub subscription_status: String,
    /// End of the current paid period.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.to_string(),
            plan_type: account.plan_type,
            quota: account.quota,
            used: account.used,
            remaining: account.remaining(),
            subscription_status: account.subscription_status.clone(),
            current_period_end: account.current_period_end,
            created_at: account.created_at,
        }
    }
}

/// Create account request.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account email.
    pub email: String,
    /// Starting plan (default `free`).
    pub plan: Option<String>,
}

/// Register a new account.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let email = parse_email(&body.email)?;
    let plan = body
        .plan
        .as_deref()
        .map_or(PlanType::Free, PlanType::from_id);

    let account = Account::with_plan(email, plan);
    state.store.insert_account(&account).await?;

    tracing::info!(
        service = %auth.service_name,
        email = %account.email,
        plan = %plan,
        "Account created"
    );

    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// Get an account by email.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(email): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let email = parse_email(&email)?;
    let account = state
        .store
        .get_account(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("account not found: {email}")))?;

    Ok(Json(AccountResponse::from(&account)))
}
