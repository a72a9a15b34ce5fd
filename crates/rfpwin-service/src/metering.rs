//! Usage metering: the gate, the recorder, the monthly reset and plan changes.
//!
//! Handlers and the webhook relay go through [`UsageMeter`] instead of the
//! store so every path applies the same rules:
//!
//! - the gate creates a free account the first time it sees an email,
//! - the gate denies (`degraded`) when the account cannot be read,
//! - the recorder increments with one atomic store call,
//! - audit rows are best-effort,
//! - [`MeteringPolicy`] decides, in [`UsageMeter::record`] only, whether a
//!   failed increment fails the request.
//!
//! Gate and recorder are not serialized. Two requests at `used = quota - 1`
//! can both pass the gate and leave `used = quota + 1`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rfpwin_core::{
    Account, ActionKind, BillingError, Email, PlanChange, PlanType, Result, UsageCheck,
    UsageLogEntry, UsageReset,
};
use rfpwin_store::{Store, StoreError};

use crate::config::MeteringPolicy;

/// Outcome of recording one billable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Whether the unit was persisted.
    pub success: bool,
    /// Counter after the increment.
    pub used: i64,
    /// Units left after the increment.
    pub remaining: i64,
    /// The account's quota.
    pub limit: i64,
}

impl UsageRecord {
    fn recorded(account: &Account) -> Self {
        Self {
            success: true,
            used: account.used,
            remaining: account.remaining(),
            limit: account.quota,
        }
    }

    fn not_recorded() -> Self {
        Self {
            success: false,
            used: 0,
            remaining: 0,
            limit: 0,
        }
    }
}

/// Outcome of a monthly reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    /// Accounts whose counter was zeroed.
    pub accounts_updated: u64,
    /// When the reset ran.
    pub reset_at: DateTime<Utc>,
}

impl From<UsageReset> for ResetSummary {
    fn from(reset: UsageReset) -> Self {
        Self {
            accounts_updated: reset.accounts_updated,
            reset_at: reset.reset_at,
        }
    }
}

/// An account's usage numbers as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// The account.
    pub email: Email,
    /// Units consumed this period.
    pub used: i64,
    /// Monthly quota.
    pub limit: i64,
    /// Units left.
    pub remaining: i64,
    /// Current plan.
    pub plan_type: PlanType,
    /// Status mirrored from Stripe.
    pub subscription_status: String,
}

impl From<&Account> for UsageSummary {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            used: account.used,
            limit: account.quota,
            remaining: account.remaining(),
            plan_type: account.plan_type,
            subscription_status: account.subscription_status.clone(),
        }
    }
}

/// Payment-platform references attached to a plan change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Stripe customer ID.
    pub customer_id: Option<String>,
    /// Stripe subscription ID.
    pub subscription_id: Option<String>,
    /// Period start.
    pub period_start: Option<DateTime<Utc>>,
    /// Period end.
    pub period_end: Option<DateTime<Utc>>,
}

/// The metering engine.
#[derive(Clone)]
pub struct UsageMeter {
    store: Arc<dyn Store>,
    policy: MeteringPolicy,
}

impl UsageMeter {
    /// Create a meter over a store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, policy: MeteringPolicy) -> Self {
        Self { store, policy }
    }

    /// The write policy in force.
    #[must_use]
    pub fn policy(&self) -> MeteringPolicy {
        self.policy
    }

    // =========================================================================
    // Usage Gate
    // =========================================================================

    /// Decide whether `email` may perform one more billable action.
    ///
    /// Never fails. Unknown emails get a persisted free account. Store
    /// failures produce [`UsageCheck::denied_on_failure`].
    pub async fn check_usage_limit(&self, email: &Email, action: ActionKind) -> UsageCheck {
        let account = match self.load_or_create(email).await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(email = %email, action = %action, error = %e, "Usage gate lookup failed, denying");
                return UsageCheck::denied_on_failure();
            }
        };

        let check = UsageCheck::for_account(&account);
        tracing::debug!(
            email = %email,
            action = %action,
            allowed = check.allowed,
            remaining = check.remaining,
            limit = check.limit,
            "Usage gate evaluated"
        );
        check
    }

    async fn load_or_create(&self, email: &Email) -> std::result::Result<Account, StoreError> {
        if let Some(account) = self.store.get_account(email).await? {
            return Ok(account);
        }

        let account = Account::new(email.clone());
        match self.store.insert_account(&account).await {
            Ok(()) => {
                tracing::info!(email = %email, "Created free account on first usage check");
                Ok(account)
            }
            // Another request created it first.
            Err(StoreError::AlreadyExists { .. }) => self
                .store
                .get_account(email)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "account",
                    id: email.to_string(),
                }),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Usage Recorder
    // =========================================================================

    /// Consume one billable unit and write an audit row.
    ///
    /// The audit row is best-effort. The increment is not.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` when the account does not exist and
    /// `WriteFailure` when the increment did not persist.
    pub async fn log_usage(
        &self,
        email: &Email,
        action: ActionKind,
        metadata: serde_json::Value,
    ) -> Result<UsageRecord> {
        let account = self
            .store
            .increment_usage(email)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => BillingError::AccountNotFound {
                    email: email.to_string(),
                },
                other => BillingError::WriteFailure(other.to_string()),
            })?;

        let entry = UsageLogEntry::new(email.clone(), action, metadata, account.used);
        if let Err(e) = self.store.append_usage_log(&entry).await {
            tracing::warn!(email = %email, action = %action, error = %e, "Failed to write usage audit row");
        }

        tracing::info!(
            email = %email,
            action = %action,
            used = account.used,
            limit = account.quota,
            "Usage recorded"
        );
        Ok(UsageRecord::recorded(&account))
    }

    /// [`Self::log_usage`] under the configured [`MeteringPolicy`].
    ///
    /// # Errors
    ///
    /// `AccountNotFound` always propagates. `WriteFailure` propagates only
    /// when the policy is mandatory; otherwise the call returns
    /// `success = false`.
    pub async fn record(
        &self,
        email: &Email,
        action: ActionKind,
        metadata: serde_json::Value,
    ) -> Result<UsageRecord> {
        match self.log_usage(email, action, metadata).await {
            Err(BillingError::WriteFailure(msg)) if !self.policy.mandatory => {
                tracing::warn!(email = %email, action = %action, error = %msg, "Usage not recorded, continuing (best-effort metering)");
                Ok(UsageRecord::not_recorded())
            }
            other => other,
        }
    }

    /// Gate then record, as one call.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` when the gate denies, `LookupFailure` when the gate
    /// was degraded, and whatever [`Self::record`] returns.
    pub async fn track(
        &self,
        email: &Email,
        action: ActionKind,
        metadata: serde_json::Value,
    ) -> Result<UsageRecord> {
        let check = self.check_usage_limit(email, action).await;
        if check.degraded {
            return Err(BillingError::LookupFailure(format!(
                "account {email} could not be read"
            )));
        }
        if !check.allowed {
            return Err(BillingError::QuotaExceeded {
                remaining: check.remaining,
                limit: check.limit,
                plan_type: check.plan_type,
            });
        }
        self.record(email, action, metadata).await
    }

    /// Current usage numbers for an account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` for unknown emails, `LookupFailure` on store errors.
    pub async fn usage_summary(&self, email: &Email) -> Result<UsageSummary> {
        let account = self
            .store
            .get_account(email)
            .await
            .map_err(|e| BillingError::LookupFailure(e.to_string()))?
            .ok_or_else(|| BillingError::AccountNotFound {
                email: email.to_string(),
            })?;
        Ok(UsageSummary::from(&account))
    }

    // =========================================================================
    // Monthly Reset
    // =========================================================================

    /// Zero every account's counter.
    ///
    /// # Errors
    ///
    /// `WriteFailure` if the bulk update fails.
    pub async fn reset_all_usage(&self) -> Result<ResetSummary> {
        let reset = self
            .store
            .reset_all_usage()
            .await
            .map_err(|e| BillingError::WriteFailure(e.to_string()))?;
        tracing::info!(accounts_updated = reset.accounts_updated, "Monthly usage reset complete");
        Ok(reset.into())
    }

    /// The most recent reset, if any.
    ///
    /// # Errors
    ///
    /// `LookupFailure` on store errors.
    pub async fn last_reset(&self) -> Result<Option<ResetSummary>> {
        self.store
            .last_usage_reset()
            .await
            .map(|r| r.map(ResetSummary::from))
            .map_err(|e| BillingError::LookupFailure(e.to_string()))
    }

    // =========================================================================
    // Plan Changes
    // =========================================================================

    /// Move an account to `plan` with the catalog quota and a fresh counter.
    ///
    /// Creates the account when it does not exist. Stripe ids left `None` in
    /// `subscription` keep their stored values.
    ///
    /// # Errors
    ///
    /// `WriteFailure` if the upsert fails.
    pub async fn apply_plan(
        &self,
        email: &Email,
        plan: PlanType,
        subscription: SubscriptionInfo,
    ) -> Result<Account> {
        let change = PlanChange::upgrade(plan)
            .with_stripe(subscription.customer_id, subscription.subscription_id)
            .with_period(subscription.period_start, subscription.period_end);
        let account = self.write_plan_change(email, &change).await?;
        tracing::info!(email = %email, plan = %plan, quota = account.quota, "Plan applied");
        Ok(account)
    }

    /// Mirror a subscription's status and period onto the account holding it.
    ///
    /// Returns `None` when no account holds the subscription.
    ///
    /// # Errors
    ///
    /// `LookupFailure` or `WriteFailure` on store errors.
    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        status: &str,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<Option<Account>> {
        let Some(account) = self.find_by_subscription(subscription_id).await? else {
            return Ok(None);
        };
        let change =
            PlanChange::status_update(&account, status).with_period(period_start, period_end);
        let updated = self.write_plan_change(&account.email, &change).await?;
        tracing::info!(email = %updated.email, subscription_id, status, "Subscription status mirrored");
        Ok(Some(updated))
    }

    /// Downgrade the account holding a deleted subscription to the free plan.
    ///
    /// Usage is kept. Returns `None` when no account holds the subscription.
    ///
    /// # Errors
    ///
    /// `LookupFailure` or `WriteFailure` on store errors.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<Option<Account>> {
        let Some(account) = self.find_by_subscription(subscription_id).await? else {
            return Ok(None);
        };
        let updated = self
            .write_plan_change(&account.email, &PlanChange::cancel())
            .await?;
        tracing::info!(email = %updated.email, subscription_id, "Subscription canceled, downgraded to free");
        Ok(Some(updated))
    }

    async fn find_by_subscription(&self, subscription_id: &str) -> Result<Option<Account>> {
        self.store
            .find_account_by_subscription(subscription_id)
            .await
            .map_err(|e| BillingError::LookupFailure(e.to_string()))
    }

    async fn write_plan_change(&self, email: &Email, change: &PlanChange) -> Result<Account> {
        self.store
            .apply_plan_change(email, change)
            .await
            .map_err(|e| BillingError::WriteFailure(e.to_string()))
    }
}
