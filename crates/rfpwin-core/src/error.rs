//! Error types for RFP Win metering.

use crate::ids::IdError;
use crate::PlanType;

/// Result type for metering operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in metering operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The account's quota is used up.
    #[error("quota exceeded: remaining={remaining}, limit={limit}, plan={plan_type}")]
    QuotaExceeded {
        /// Units left (always zero).
        remaining: i64,
        /// The account's quota.
        limit: i64,
        /// The account's plan.
        plan_type: PlanType,
    },

    /// Account not found.
    #[error("account not found: {email}")]
    AccountNotFound {
        /// The email that was not found.
        email: String,
    },

    /// Account already exists.
    #[error("account already exists: {email}")]
    AccountAlreadyExists {
        /// The email that already exists.
        email: String,
    },

    /// The account row could not be read.
    #[error("account lookup failed: {0}")]
    LookupFailure(String),

    /// A counter increment or reset did not persist.
    #[error("usage write failed: {0}")]
    WriteFailure(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}
