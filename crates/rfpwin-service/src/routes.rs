//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, company, health, plans, usage, webhooks};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for usage endpoints.
const USAGE_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/plans` - Plan catalog
///
/// ## Accounts (Service API key)
/// - `POST /v1/accounts` - Register an account
/// - `GET /v1/accounts/:email` - Get an account
///
/// ## Usage (Service API key, rate-limited)
/// - `POST /v1/usage/check` - Usage gate
/// - `POST /v1/usage/log` - Usage recorder
/// - `POST /v1/usage/track` - Gate then record
/// - `GET /v1/usage/:email` - Usage summary
/// - `GET /v1/usage/:email/logs` - Audit rows
///
/// ## Company profiles (Service API key)
/// - `PUT /v1/company-profiles` - Save a profile
/// - `GET /v1/company-profiles` - Get the default profile
/// - `GET /v1/company-profiles/:id` - Get a profile
///
/// ## Admin (Admin API key)
/// - `POST /v1/admin/usage/reset` - Monthly reset
/// - `GET /v1/admin/usage/reset` - Last reset
/// - `POST /v1/admin/plans` - Set an account's plan
/// - `GET /v1/admin/accounts` - List accounts
///
/// ## Webhooks (Signature verification)
/// - `POST /webhooks/stripe` - Stripe webhooks
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Usage endpoints sit on every billable request from the analysis and
    // proposal services, so they get their own, higher limit.
    let usage_routes = Router::new()
        .route("/check", post(usage::check_usage))
        .route("/log", post(usage::log_usage))
        .route("/track", post(usage::track_usage))
        .route("/:email", get(usage::get_usage))
        .route("/:email/logs", get(usage::list_usage_logs))
        .layer(ConcurrencyLimitLayer::new(USAGE_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/:email", get(accounts::get_account))
        // Company profiles
        .route(
            "/company-profiles",
            put(company::save_profile).get(company::get_default_profile),
        )
        .route("/company-profiles/:id", get(company::get_profile))
        // Admin
        .route(
            "/admin/usage/reset",
            post(admin::reset_usage).get(admin::reset_status),
        )
        .route("/admin/plans", post(admin::set_plan))
        .route("/admin/accounts", get(admin::list_accounts))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        // Usage routes (with their own concurrency limit)
        .nest("/usage", usage_routes)
        // Catalog (public)
        .route("/plans", get(plans::list_plans));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by Stripe)
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
