//! Usage types for RFP Win metering.
//!
//! Billable actions, the gate's answer, and the audit rows the recorder writes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Account, Email, PlanType, UsageLogId};

/// A billable action. Every kind consumes the same per-account counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Analysing an uploaded RFP document.
    RfpAnalysis,

    /// Generating a proposal draft.
    ProposalGeneration,
}

impl ActionKind {
    /// Get the action name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RfpAnalysis => "rfp_analysis",
            Self::ProposalGeneration => "proposal_generation",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rfp_analysis" => Ok(Self::RfpAnalysis),
            "proposal_generation" => Ok(Self::ProposalGeneration),
            other => Err(format!("unknown action kind: {other}")),
        }
    }
}

/// The Usage Gate's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCheck {
    /// Whether the action may proceed.
    pub allowed: bool,

    /// Units left this period.
    pub remaining: i64,

    /// The account's quota.
    pub limit: i64,

    /// The account's plan.
    pub plan_type: PlanType,

    /// Set when the account could not be read and the gate denied by default.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl UsageCheck {
    /// Evaluate the gate against an account row.
    #[must_use]
    pub fn for_account(account: &Account) -> Self {
        let remaining = account.remaining();
        Self {
            allowed: remaining > 0,
            remaining,
            limit: account.quota,
            plan_type: account.plan_type,
            degraded: false,
        }
    }

    /// The fail-closed answer used when the account cannot be read.
    #[must_use]
    pub const fn denied_on_failure() -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit: 0,
            plan_type: PlanType::Free,
            degraded: true,
        }
    }
}

/// An audit row written after a billable action is recorded.
///
/// Informational only; nothing reads these back to make decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    /// Row ID (time-ordered).
    pub id: UsageLogId,

    /// The account charged.
    pub email: Email,

    /// What was done.
    pub action: ActionKind,

    /// Caller-supplied context (file name, size, proposal length, ...).
    pub metadata: serde_json::Value,

    /// Counter value right after this unit was recorded.
    pub used_after: i64,

    /// When the unit was recorded.
    pub created_at: DateTime<Utc>,
}

impl UsageLogEntry {
    /// Create a new audit row.
    #[must_use]
    pub fn new(email: Email, action: ActionKind, metadata: serde_json::Value, used_after: i64) -> Self {
        Self {
            id: UsageLogId::generate(),
            email,
            action,
            metadata,
            used_after,
            created_at: Utc::now(),
        }
    }
}

/// A completed monthly reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReset {
    /// Number of accounts whose counter was zeroed.
    pub accounts_updated: u64,

    /// When the reset ran.
    pub reset_at: DateTime<Utc>,
}

impl UsageReset {
    /// Record a reset that just happened.
    #[must_use]
    pub fn now(accounts_updated: u64) -> Self {
        Self {
            accounts_updated,
            reset_at: Utc::now(),
        }
    }
}
