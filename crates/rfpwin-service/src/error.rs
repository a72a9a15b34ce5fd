//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use rfpwin_core::{BillingError, PlanType};
use rfpwin_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The account has no units left this period.
    #[error("quota exceeded: remaining={remaining}, limit={limit}")]
    QuotaExceeded {
        /// Units left.
        remaining: i64,
        /// The account's quota.
        limit: i64,
        /// The account's plan.
        plan_type: PlanType,
    },

    /// The metering store could not be read; the action was denied.
    #[error("metering unavailable")]
    MeteringUnavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::QuotaExceeded {
                remaining,
                limit,
                plan_type,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "quota_exceeded",
                "Usage limit reached. Upgrade your plan to continue.".to_string(),
                Some(serde_json::json!({
                    "remaining": remaining,
                    "limit": limit,
                    "plan_type": plan_type,
                })),
            ),
            Self::MeteringUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "metering_unavailable",
                "Usage metering is temporarily unavailable, retry later".to_string(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred, retry later".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::AlreadyExists { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::QuotaExceeded {
                remaining,
                limit,
                plan_type,
            } => Self::QuotaExceeded {
                remaining,
                limit,
                plan_type,
            },
            BillingError::AccountNotFound { email } => {
                Self::NotFound(format!("account not found: {email}"))
            }
            BillingError::AccountAlreadyExists { email } => {
                Self::Conflict(format!("account already exists: {email}"))
            }
            BillingError::LookupFailure(_) => Self::MeteringUnavailable,
            BillingError::InvalidId(e) => Self::BadRequest(e.to_string()),
            BillingError::WriteFailure(msg) | BillingError::Configuration(msg) => {
                Self::Internal(msg)
            }
        }
    }
}
