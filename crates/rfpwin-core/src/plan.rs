//! The plan catalog.
//!
//! Every plan maps to a fixed monthly analysis quota. Unknown plan identifiers
//! resolve to [`PlanType::Free`] everywhere; there is no per-call-site fallback.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Free plan monthly quota.
pub const FREE_QUOTA: i64 = 3;

/// Basic plan monthly quota.
pub const BASIC_QUOTA: i64 = 25;

/// Pro plan monthly quota.
pub const PRO_QUOTA: i64 = 250;

/// Enterprise plan monthly quota.
pub const ENTERPRISE_QUOTA: i64 = 5000;

/// Checkout total (in cents) at or above which a purchase is the pro plan.
pub const PRO_CHECKOUT_MIN_CENTS: i64 = 29_900;

/// Checkout total (in cents) at or above which a purchase is the enterprise plan.
pub const ENTERPRISE_CHECKOUT_MIN_CENTS: i64 = 79_900;

/// Available plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlanType {
    /// Free tier: 3 analyses per month.
    Free,

    /// Basic plan: 25 analyses per month.
    Basic,

    /// Pro plan: 250 analyses per month.
    Pro,

    /// Enterprise plan: 5000 analyses per month.
    Enterprise,
}

impl PlanType {
    /// Resolve a plan identifier, falling back to `Free` for unknown ids.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        Self::parse(id).unwrap_or_else(|| {
            tracing::warn!(plan_id = %id, "Unknown plan identifier, treating as free");
            Self::Free
        })
    }

    /// Parse a plan identifier, returning `None` when it is not in the catalog.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "basic" => Some(Self::Basic),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    /// Get the canonical monthly quota for this plan.
    #[must_use]
    pub const fn quota(self) -> i64 {
        match self {
            Self::Free => FREE_QUOTA,
            Self::Basic => BASIC_QUOTA,
            Self::Pro => PRO_QUOTA,
            Self::Enterprise => ENTERPRISE_QUOTA,
        }
    }

    /// Infer the purchased plan from a checkout total in cents.
    ///
    /// Any paid checkout below the pro threshold is treated as basic.
    #[must_use]
    pub const fn from_checkout_amount_cents(amount_cents: i64) -> Self {
        if amount_cents >= ENTERPRISE_CHECKOUT_MIN_CENTS {
            Self::Enterprise
        } else if amount_cents >= PRO_CHECKOUT_MIN_CENTS {
            Self::Pro
        } else {
            Self::Basic
        }
    }

    /// The plan identifier as stored and sent over the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    /// All plans, cheapest first.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Free, Self::Basic, Self::Pro, Self::Enterprise]
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PlanType {
    fn from(value: String) -> Self {
        Self::from_id(&value)
    }
}

impl From<PlanType> for String {
    fn from(plan: PlanType) -> Self {
        plan.as_str().to_string()
    }
}

/// Look up the monthly quota for a plan identifier.
///
/// Unknown identifiers get the free quota.
#[must_use]
pub fn quota_for(plan_id: &str) -> i64 {
    PlanType::from_id(plan_id).quota()
}

/// A catalog entry, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInfo {
    /// The plan.
    pub plan: PlanType,
    /// Monthly quota.
    pub quota: i64,
}

/// List the whole catalog.
#[must_use]
pub fn catalog() -> Vec<PlanInfo> {
    PlanType::all()
        .into_iter()
        .map(|plan| PlanInfo {
            plan,
            quota: plan.quota(),
        })
        .collect()
}
