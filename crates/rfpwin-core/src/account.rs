//! Account types for RFP Win metering.
//!
//! An account is one customer row: its plan, its monthly quota, and the usage
//! counter the gate compares against that quota.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Email, PlanType};

/// Subscription status given to accounts that are not paying (or just paid).
pub const STATUS_ACTIVE: &str = "active";

/// Subscription status given to accounts whose subscription was deleted.
pub const STATUS_CANCELED: &str = "canceled";

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account key.
    pub email: Email,

    /// Current plan.
    pub plan_type: PlanType,

    /// Monthly allowance. Normally `plan_type.quota()`, may be overridden.
    pub quota: i64,

    /// Billable actions consumed in the current period. Never negative.
    pub used: i64,

    /// Status mirrored from the payment platform (`active`, `canceled`, ...).
    /// Advisory only; the gate does not read it.
    pub subscription_status: String,

    /// Stripe customer ID, once the customer has paid.
    pub stripe_customer_id: Option<String>,

    /// Stripe subscription ID for the current plan.
    pub stripe_subscription_id: Option<String>,

    /// Start of the current paid period.
    pub current_period_start: Option<DateTime<Utc>>,

    /// End of the current paid period.
    pub current_period_end: Option<DateTime<Utc>>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh free-plan account with no usage.
    #[must_use]
    pub fn new(email: Email) -> Self {
        Self::with_plan(email, PlanType::Free)
    }

    /// Create a fresh account on the given plan with its catalog quota.
    #[must_use]
    pub fn with_plan(email: Email, plan_type: PlanType) -> Self {
        let now = Utc::now();
        Self {
            email,
            plan_type,
            quota: plan_type.quota(),
            used: 0,
            subscription_status: STATUS_ACTIVE.to_string(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            current_period_start: None,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Units left this period, floored at zero.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        (self.quota - self.used).max(0)
    }

    /// Whether another billable action may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.remaining() > 0
    }

    /// Apply a plan change in place.
    pub fn apply(&mut self, change: &PlanChange) {
        self.plan_type = change.plan_type;
        self.quota = change.quota;
        if change.reset_usage {
            self.used = 0;
        }
        self.subscription_status.clone_from(&change.subscription_status);
        if change.stripe_customer_id.is_some() {
            self.stripe_customer_id.clone_from(&change.stripe_customer_id);
        }
        if change.clear_subscription {
            self.stripe_subscription_id = None;
        } else if change.stripe_subscription_id.is_some() {
            self.stripe_subscription_id
                .clone_from(&change.stripe_subscription_id);
        }
        if change.current_period_start.is_some() {
            self.current_period_start = change.current_period_start;
        }
        if change.current_period_end.is_some() {
            self.current_period_end = change.current_period_end;
        }
        self.updated_at = Utc::now();
    }
}

/// A plan change coming from the billing collaborator or an admin.
///
/// Applied as an upsert: the account is created when it does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanChange {
    /// The new plan.
    pub plan_type: PlanType,

    /// The new quota.
    pub quota: i64,

    /// Whether to zero the usage counter.
    pub reset_usage: bool,

    /// New subscription status.
    pub subscription_status: String,

    /// Stripe customer ID. `None` keeps the stored value.
    pub stripe_customer_id: Option<String>,

    /// Stripe subscription ID. `None` keeps the stored value.
    pub stripe_subscription_id: Option<String>,

    /// Drop the stored subscription ID. Only set when a subscription ends.
    #[serde(default)]
    pub clear_subscription: bool,

    /// Period start. `None` keeps the stored value.
    pub current_period_start: Option<DateTime<Utc>>,

    /// Period end. `None` keeps the stored value.
    pub current_period_end: Option<DateTime<Utc>>,
}

impl PlanChange {
    /// An upgrade (or manual fix) to `plan_type`: catalog quota, usage reset, active.
    #[must_use]
    pub fn upgrade(plan_type: PlanType) -> Self {
        Self {
            plan_type,
            quota: plan_type.quota(),
            reset_usage: true,
            subscription_status: STATUS_ACTIVE.to_string(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            clear_subscription: false,
            current_period_start: None,
            current_period_end: None,
        }
    }

    /// A downgrade to the free plan after a subscription ends. Usage is kept.
    #[must_use]
    pub fn cancel() -> Self {
        Self {
            plan_type: PlanType::Free,
            quota: PlanType::Free.quota(),
            reset_usage: false,
            subscription_status: STATUS_CANCELED.to_string(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            clear_subscription: true,
            current_period_start: None,
            current_period_end: None,
        }
    }

    /// Mirror a new subscription status onto an account, keeping its plan and usage.
    #[must_use]
    pub fn status_update(account: &Account, status: impl Into<String>) -> Self {
        Self {
            plan_type: account.plan_type,
            quota: account.quota,
            reset_usage: false,
            subscription_status: status.into(),
            stripe_customer_id: None,
            stripe_subscription_id: account.stripe_subscription_id.clone(),
            clear_subscription: false,
            current_period_start: None,
            current_period_end: None,
        }
    }

    /// Attach Stripe identifiers.
    #[must_use]
    pub fn with_stripe(
        mut self,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    ) -> Self {
        self.stripe_customer_id = customer_id;
        self.stripe_subscription_id = subscription_id;
        self
    }

    /// Attach the subscription period.
    #[must_use]
    pub fn with_period(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.current_period_start = start;
        self.current_period_end = end;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("a@x.com").unwrap()
    }

    #[test]
    fn new_account_is_free_and_unused() {
        let account = Account::new(email());
        assert_eq!(account.plan_type, PlanType::Free);
        assert_eq!(account.quota, 3);
        assert_eq!(account.used, 0);
        assert_eq!(account.subscription_status, STATUS_ACTIVE);
        assert!(account.is_allowed());
    }

    #[test]
    fn remaining_is_floored_at_zero() {
        let mut account = Account::with_plan(email(), PlanType::Basic);
        account.used = 24;
        assert_eq!(account.remaining(), 1);
        assert!(account.is_allowed());

        account.used = 25;
        assert_eq!(account.remaining(), 0);
        assert!(!account.is_allowed());

        account.used = 27;
        assert_eq!(account.remaining(), 0);
        assert!(!account.is_allowed());
    }

    #[test]
    fn upgrade_resets_usage() {
        let mut account = Account::new(email());
        account.used = 3;
        account.apply(&PlanChange::upgrade(PlanType::Pro).with_stripe(
            Some("cus_1".into()),
            Some("sub_1".into()),
        ));

        assert_eq!(account.plan_type, PlanType::Pro);
        assert_eq!(account.quota, 250);
        assert_eq!(account.used, 0);
        assert_eq!(account.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(account.stripe_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn cancel_keeps_usage_and_customer() {
        let mut account = Account::with_plan(email(), PlanType::Pro);
        account.used = 40;
        account.stripe_customer_id = Some("cus_1".into());
        account.stripe_subscription_id = Some("sub_1".into());

        account.apply(&PlanChange::cancel());

        assert_eq!(account.plan_type, PlanType::Free);
        assert_eq!(account.quota, 3);
        assert_eq!(account.used, 40);
        assert_eq!(account.subscription_status, STATUS_CANCELED);
        assert_eq!(account.stripe_customer_id.as_deref(), Some("cus_1"));
        assert!(account.stripe_subscription_id.is_none());
        assert!(!account.is_allowed());
    }

    #[test]
    fn plan_fix_keeps_subscription() {
        let mut account = Account::with_plan(email(), PlanType::Basic);
        account.stripe_subscription_id = Some("sub_1".into());

        account.apply(&PlanChange::upgrade(PlanType::Pro));

        assert_eq!(account.plan_type, PlanType::Pro);
        assert_eq!(account.stripe_subscription_id.as_deref(), Some("sub_1"));
    }
}
