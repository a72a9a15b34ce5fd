//! RFP Win usage-metering HTTP service.
//!
//! This crate provides the HTTP API that the analysis and proposal services
//! call before and after every billable action:
//!
//! - Usage gate and recorder (`/v1/usage/*`)
//! - Account signup and lookup
//! - Monthly reset and plan fixes (admin)
//! - Stripe webhook relay for plan changes
//! - Company profile storage
//!
//! # Authentication
//!
//! 1. **Service API key** (`X-API-Key`) - collaborator services
//! 2. **Admin API key** (`X-Admin-Key`) - reset, plan and listing endpoints
//!
//! Stripe webhooks authenticate by signature.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers must be async

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod metering;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::{MeteringPolicy, ServiceConfig};
pub use error::ApiError;
pub use metering::{ResetSummary, SubscriptionInfo, UsageMeter, UsageRecord, UsageSummary};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
