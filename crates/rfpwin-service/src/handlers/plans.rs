//! Plan catalog handler.

use axum::Json;

use rfpwin_core::{catalog, PlanInfo};

/// List every plan and its monthly quota.
pub async fn list_plans() -> Json<Vec<PlanInfo>> {
    Json(catalog())
}
