//! `RocksDB` storage implementation.
//!
//! `RocksDB` has no atomic field update, so every read-modify-write on the
//! accounts column family runs under `write_lock`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use tokio::sync::Mutex;

use rfpwin_core::{Account, CompanyProfile, Email, PlanChange, UsageLogEntry, UsageReset};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf, LAST_RESET_KEY};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read_account(&self, email: &Email) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf, keys::account_key(email))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let value = Self::serialize(account)?;
        self.db
            .put_cf(&cf, keys::account_key(&account.email), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn all_accounts(&self) -> Result<Vec<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            accounts.push(Self::deserialize(&value)?);
        }
        Ok(accounts)
    }
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn get_account(&self, email: &Email) -> Result<Option<Account>> {
        self.read_account(email)
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.read_account(&account.email)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: account.email.to_string(),
            });
        }
        self.write_account(account)
    }

    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<Account>> {
        let mut accounts = self.all_accounts()?;
        accounts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(accounts.into_iter().skip(offset).take(limit).collect())
    }

    async fn apply_plan_change(&self, email: &Email, change: &PlanChange) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        let mut account = self
            .read_account(email)?
            .unwrap_or_else(|| Account::new(email.clone()));
        account.apply(change);
        self.write_account(&account)?;
        Ok(account)
    }

    async fn find_account_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Account>> {
        Ok(self
            .all_accounts()?
            .into_iter()
            .find(|a| a.stripe_subscription_id.as_deref() == Some(subscription_id)))
    }

    // =========================================================================
    // Usage Counter Operations
    // =========================================================================

    async fn increment_usage(&self, email: &Email) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        let mut account = self
            .read_account(email)?
            .ok_or_else(|| StoreError::account_not_found(email))?;
        account.used += 1;
        account.updated_at = chrono::Utc::now();
        self.write_account(&account)?;
        Ok(account)
    }

    async fn reset_all_usage(&self) -> Result<UsageReset> {
        let _guard = self.write_lock.lock().await;
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_meta = self.cf(cf::META)?;

        let now = chrono::Utc::now();
        let accounts = self.all_accounts()?;
        let mut batch = WriteBatch::default();
        for mut account in accounts.iter().cloned() {
            account.used = 0;
            account.updated_at = now;
            batch.put_cf(
                &cf_accounts,
                keys::account_key(&account.email),
                Self::serialize(&account)?,
            );
        }

        let reset = UsageReset::now(accounts.len() as u64);
        batch.put_cf(&cf_meta, LAST_RESET_KEY, Self::serialize(&reset)?);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(reset)
    }

    async fn last_usage_reset(&self) -> Result<Option<UsageReset>> {
        let cf = self.cf(cf::META)?;
        self.db
            .get_cf(&cf, LAST_RESET_KEY)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Audit Log Operations
    // =========================================================================

    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()> {
        let cf_logs = self.cf(cf::USAGE_LOGS)?;
        let cf_by_email = self.cf(cf::USAGE_LOGS_BY_EMAIL)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_logs, keys::usage_log_key(&entry.id), Self::serialize(entry)?);
        batch.put_cf(&cf_by_email, keys::email_usage_log_key(&entry.email, &entry.id), []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn list_usage_logs(
        &self,
        email: &Email,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageLogEntry>> {
        let cf_logs = self.cf(cf::USAGE_LOGS)?;
        let cf_by_email = self.cf(cf::USAGE_LOGS_BY_EMAIL)?;
        let prefix = keys::email_usage_logs_prefix(email);

        let mut index_keys = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf_by_email, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            index_keys.push(key);
        }

        let mut entries = Vec::new();
        for key in index_keys.iter().rev().skip(offset).take(limit) {
            let Some(id) = keys::extract_log_id(key) else {
                continue;
            };
            let row = self
                .db
                .get_cf(&cf_logs, keys::usage_log_key(&id))
                .map_err(|e| StoreError::Database(e.to_string()))?;
            if let Some(data) = row {
                entries.push(Self::deserialize(&data)?);
            }
        }
        Ok(entries)
    }

    // =========================================================================
    // Company Profile Operations
    // =========================================================================

    async fn put_company_profile(&self, profile: &CompanyProfile) -> Result<()> {
        let cf = self.cf(cf::COMPANY_PROFILES)?;
        let value = Self::serialize(profile)?;
        self.db
            .put_cf(&cf, keys::company_profile_key(&profile.id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn get_company_profile(&self, id: &str) -> Result<Option<CompanyProfile>> {
        let cf = self.cf(cf::COMPANY_PROFILES)?;
        self.db
            .get_cf(&cf, keys::company_profile_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    async fn ping(&self) -> Result<()> {
        self.cf(cf::ACCOUNTS).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use rfpwin_core::{ActionKind, PlanType};
    use tempfile::TempDir;

    use super::*;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn account_crud() {
        let (store, _dir) = create_test_store();
        let account = Account::new(email("a@x.com"));

        store.insert_account(&account).await.unwrap();
        let retrieved = store.get_account(&account.email).await.unwrap().unwrap();
        assert_eq!(retrieved.email, account.email);
        assert_eq!(retrieved.quota, 3);

        assert!(store.insert_account(&account).await.is_err());
    }

    #[tokio::test]
    async fn increment_and_reset() {
        let (store, _dir) = create_test_store();
        let user = email("a@x.com");
        store.insert_account(&Account::new(user.clone())).await.unwrap();

        assert_eq!(store.increment_usage(&user).await.unwrap().used, 1);
        assert_eq!(store.increment_usage(&user).await.unwrap().used, 2);

        let reset = store.reset_all_usage().await.unwrap();
        assert_eq!(reset.accounts_updated, 1);
        assert_eq!(store.get_account(&user).await.unwrap().unwrap().used, 0);
        assert!(store.last_usage_reset().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user = email("a@x.com");
        store.insert_account(&Account::new(user.clone())).await.unwrap();

        let tasks = (0..20).map(|_| {
            let store = store.clone();
            let user = user.clone();
            tokio::spawn(async move { store.increment_usage(&user).await })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.get_account(&user).await.unwrap().unwrap().used, 20);
    }

    #[tokio::test]
    async fn plan_change_and_subscription_lookup() {
        let (store, _dir) = create_test_store();
        let user = email("a@x.com");
        let change = PlanChange::upgrade(PlanType::Enterprise)
            .with_stripe(Some("cus_1".into()), Some("sub_1".into()));

        let account = store.apply_plan_change(&user, &change).await.unwrap();
        assert_eq!(account.quota, 5000);

        let found = store.find_account_by_subscription("sub_1").await.unwrap();
        assert_eq!(found.unwrap().plan_type, PlanType::Enterprise);
    }

    #[tokio::test]
    async fn usage_logs_pagination() {
        let (store, _dir) = create_test_store();
        let user = email("a@x.com");

        for used in 1..=5 {
            let entry =
                UsageLogEntry::new(user.clone(), ActionKind::RfpAnalysis, serde_json::Value::Null, used);
            store.append_usage_log(&entry).await.unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let page1 = store.list_usage_logs(&user, 2, 0).await.unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].used_after, 5);

        let page3 = store.list_usage_logs(&user, 2, 4).await.unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].used_after, 1);
    }
}
