//! Company profile handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use rfpwin_core::{CompanyProfile, DEFAULT_PROFILE_ID};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Save profile request.
#[derive(Debug, Deserialize)]
pub struct SaveProfileRequest {
    /// Profile ID (default `default-company`).
    pub id: Option<String>,
    /// Company name.
    pub name: String,
    /// What the company delivers.
    pub capabilities: Option<Vec<String>>,
    /// Everything else.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Insert or replace a company profile.
pub async fn save_profile(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<SaveProfileRequest>,
) -> Result<Json<CompanyProfile>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    let capabilities = body
        .capabilities
        .ok_or_else(|| ApiError::BadRequest("capabilities are required".into()))?;

    let mut profile = CompanyProfile::empty(body.id.unwrap_or_else(|| DEFAULT_PROFILE_ID.to_string()));
    profile.name = body.name.trim().to_string();
    profile.capabilities = capabilities;
    if let Some(details) = body.details {
        profile.details = details;
    }

    state.store.put_company_profile(&profile).await?;
    tracing::info!(profile_id = %profile.id, "Company profile saved");

    Ok(Json(profile))
}

/// Get a profile, or an empty one when nothing is stored under `id`.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(id): Path<String>,
) -> Result<Json<CompanyProfile>, ApiError> {
    Ok(Json(load_profile(&state, id).await?))
}

/// Get the `default-company` profile.
pub async fn get_default_profile(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<CompanyProfile>, ApiError> {
    Ok(Json(load_profile(&state, DEFAULT_PROFILE_ID.to_string()).await?))
}

async fn load_profile(state: &AppState, id: String) -> Result<CompanyProfile, ApiError> {
    let profile = state
        .store
        .get_company_profile(&id)
        .await?
        .unwrap_or_else(|| CompanyProfile::empty(id));
    Ok(profile)
}
