//! PostgreSQL storage implementation.
//!
//! Counter changes are single SQL statements, so the database serializes
//! concurrent increments of the same row.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::info;

use rfpwin_core::{
    Account, ActionKind, CompanyProfile, Email, PlanChange, PlanType, UsageLogEntry, UsageLogId,
    UsageReset,
};

use crate::error::{Result, StoreError};
use crate::Store;

const ACCOUNT_COLUMNS: &str = "email, plan_type, quota, used, subscription_status, \
     stripe_customer_id, stripe_subscription_id, current_period_start, current_period_end, \
     created_at, updated_at";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!(max_connections, "Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    email: String,
    plan_type: String,
    quota: i64,
    used: i64,
    subscription_status: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Self {
            email: Email::parse(&row.email).map_err(|e| StoreError::Serialization(e.to_string()))?,
            plan_type: PlanType::from_id(&row.plan_type),
            quota: row.quota,
            used: row.used,
            subscription_status: row.subscription_status,
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UsageLogRow {
    id: String,
    email: String,
    action: String,
    metadata: Json<serde_json::Value>,
    used_after: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<UsageLogRow> for UsageLogEntry {
    type Error = StoreError;

    fn try_from(row: UsageLogRow) -> Result<Self> {
        let id: UsageLogId = row
            .id
            .parse()
            .map_err(|e: rfpwin_core::IdError| StoreError::Serialization(e.to_string()))?;
        let action: ActionKind = row.action.parse().map_err(StoreError::Serialization)?;
        Ok(Self {
            id,
            email: Email::parse(&row.email).map_err(|e| StoreError::Serialization(e.to_string()))?,
            action,
            metadata: row.metadata.0,
            used_after: row.used_after,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CompanyProfileRow {
    id: String,
    name: String,
    capabilities: Json<Vec<String>>,
    details: Json<serde_json::Value>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyProfileRow> for CompanyProfile {
    fn from(row: CompanyProfileRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            capabilities: row.capabilities.0,
            details: row.details.0,
            updated_at: row.updated_at,
        }
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn get_account(&self, email: &Email) -> Result<Option<Account>> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"))
                .bind(email.as_str())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Account::try_from).transpose()
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO accounts (email, plan_type, quota, used, subscription_status, \
             stripe_customer_id, stripe_subscription_id, current_period_start, \
             current_period_end, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(account.email.as_str())
        .bind(account.plan_type.as_str())
        .bind(account.quota)
        .bind(account.used)
        .bind(&account.subscription_status)
        .bind(&account.stripe_customer_id)
        .bind(&account.stripe_subscription_id)
        .bind(account.current_period_start)
        .bind(account.current_period_end)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: account.email.to_string(),
            });
        }
        Ok(())
    }

    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             ORDER BY created_at DESC, email ASC LIMIT $1 OFFSET $2"
        ))
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Account::try_from).collect()
    }

    async fn apply_plan_change(&self, email: &Email, change: &PlanChange) -> Result<Account> {
        let row: AccountRow = sqlx::query_as(&format!(
            "INSERT INTO accounts (email, plan_type, quota, used, subscription_status, \
             stripe_customer_id, stripe_subscription_id, current_period_start, current_period_end) \
             VALUES ($1, $2, $3, 0, $4, $5, $6, $7, $8) \
             ON CONFLICT (email) DO UPDATE SET \
               plan_type = EXCLUDED.plan_type, \
               quota = EXCLUDED.quota, \
               used = CASE WHEN $9 THEN 0 ELSE accounts.used END, \
               subscription_status = EXCLUDED.subscription_status, \
               stripe_customer_id = COALESCE(EXCLUDED.stripe_customer_id, accounts.stripe_customer_id), \
               stripe_subscription_id = CASE WHEN $10 THEN NULL \
                 ELSE COALESCE(EXCLUDED.stripe_subscription_id, accounts.stripe_subscription_id) END, \
               current_period_start = COALESCE(EXCLUDED.current_period_start, accounts.current_period_start), \
               current_period_end = COALESCE(EXCLUDED.current_period_end, accounts.current_period_end), \
               updated_at = NOW() \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(change.plan_type.as_str())
        .bind(change.quota)
        .bind(&change.subscription_status)
        .bind(&change.stripe_customer_id)
        .bind(&change.stripe_subscription_id)
        .bind(change.current_period_start)
        .bind(change.current_period_end)
        .bind(change.reset_usage)
        .bind(change.clear_subscription)
        .fetch_one(&self.pool)
        .await?;
        Account::try_from(row)
    }

    async fn find_account_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE stripe_subscription_id = $1 LIMIT 1"
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Account::try_from).transpose()
    }

    // =========================================================================
    // Usage Counter Operations
    // =========================================================================

    async fn increment_usage(&self, email: &Email) -> Result<Account> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "UPDATE accounts SET used = used + 1, updated_at = NOW() \
             WHERE email = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| StoreError::account_not_found(email))?
            .try_into()
    }

    async fn reset_all_usage(&self) -> Result<UsageReset> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE accounts SET used = 0, updated_at = NOW()")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let reset_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO usage_resets (accounts_updated) VALUES ($1) RETURNING reset_at",
        )
        .bind(i64::try_from(updated).unwrap_or(i64::MAX))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UsageReset {
            accounts_updated: updated,
            reset_at,
        })
    }

    async fn last_usage_reset(&self) -> Result<Option<UsageReset>> {
        let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT accounts_updated, reset_at FROM usage_resets ORDER BY reset_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(accounts_updated, reset_at)| UsageReset {
            accounts_updated: u64::try_from(accounts_updated).unwrap_or(0),
            reset_at,
        }))
    }

    // =========================================================================
    // Audit Log Operations
    // =========================================================================

    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO usage_logs (id, email, action, metadata, used_after, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id.to_string())
        .bind(entry.email.as_str())
        .bind(entry.action.as_str())
        .bind(Json(&entry.metadata))
        .bind(entry.used_after)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_usage_logs(
        &self,
        email: &Email,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageLogEntry>> {
        let rows: Vec<UsageLogRow> = sqlx::query_as(
            "SELECT id, email, action, metadata, used_after, created_at FROM usage_logs \
             WHERE email = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(email.as_str())
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UsageLogEntry::try_from).collect()
    }

    // =========================================================================
    // Company Profile Operations
    // =========================================================================

    async fn put_company_profile(&self, profile: &CompanyProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO company_profiles (id, name, capabilities, details, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
               name = EXCLUDED.name, \
               capabilities = EXCLUDED.capabilities, \
               details = EXCLUDED.details, \
               updated_at = EXCLUDED.updated_at",
        )
        .bind(&profile.id)
        .bind(&profile.name)
        .bind(Json(&profile.capabilities))
        .bind(Json(&profile.details))
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_company_profile(&self, id: &str) -> Result<Option<CompanyProfile>> {
        let row: Option<CompanyProfileRow> = sqlx::query_as(
            "SELECT id, name, capabilities, details, updated_at FROM company_profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CompanyProfile::from))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
