//! In-memory storage implementation.
//!
//! Everything lives behind one `RwLock`, so every write (including the usage
//! increment) is serialized. Data is lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rfpwin_core::{Account, CompanyProfile, Email, PlanChange, UsageLogEntry, UsageReset};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Inner {
    accounts: HashMap<Email, Account>,
    usage_logs: Vec<UsageLogEntry>,
    company_profiles: HashMap<String, CompanyProfile>,
    last_reset: Option<UsageReset>,
}

/// Process-local storage backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_account(&self, email: &Email) -> Result<Option<Account>> {
        Ok(self.inner.read().await.accounts.get(email).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(&account.email) {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: account.email.to_string(),
            });
        }
        inner.accounts.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<Account>> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<_> = inner.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(accounts.into_iter().skip(offset).take(limit).collect())
    }

    async fn apply_plan_change(&self, email: &Email, change: &PlanChange) -> Result<Account> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .entry(email.clone())
            .or_insert_with(|| Account::new(email.clone()));
        account.apply(change);
        Ok(account.clone())
    }

    async fn find_account_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.stripe_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn increment_usage(&self, email: &Email) -> Result<Account> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .get_mut(email)
            .ok_or_else(|| StoreError::account_not_found(email))?;
        account.used += 1;
        account.updated_at = chrono::Utc::now();
        Ok(account.clone())
    }

    async fn reset_all_usage(&self) -> Result<UsageReset> {
        let mut inner = self.inner.write().await;
        let now = chrono::Utc::now();
        for account in inner.accounts.values_mut() {
            account.used = 0;
            account.updated_at = now;
        }
        let reset = UsageReset::now(inner.accounts.len() as u64);
        inner.last_reset = Some(reset);
        Ok(reset)
    }

    async fn last_usage_reset(&self) -> Result<Option<UsageReset>> {
        Ok(self.inner.read().await.last_reset)
    }

    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()> {
        self.inner.write().await.usage_logs.push(entry.clone());
        Ok(())
    }

    async fn list_usage_logs(
        &self,
        email: &Email,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageLogEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .usage_logs
            .iter()
            .rev()
            .filter(|entry| &entry.email == email)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn put_company_profile(&self, profile: &CompanyProfile) -> Result<()> {
        self.inner
            .write()
            .await
            .company_profiles
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn get_company_profile(&self, id: &str) -> Result<Option<CompanyProfile>> {
        Ok(self.inner.read().await.company_profiles.get(id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
