//! Client error types.

use rfpwin_core::PlanType;

/// Errors that can occur when using the metering client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The account has used its monthly quota.
    #[error("quota exceeded: remaining={remaining}, limit={limit}, plan={plan_type}")]
    QuotaExceeded {
        /// Units left.
        remaining: i64,
        /// The account's quota.
        limit: i64,
        /// The account's plan.
        plan_type: PlanType,
    },

    /// The metering service could not read the account. Deny and retry later.
    #[error("metering unavailable")]
    Unavailable,

    /// Account not found.
    #[error("account not found: {email}")]
    AccountNotFound {
        /// The account email.
        email: String,
    },

    /// The API key was missing or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
