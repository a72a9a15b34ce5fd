//! Storage layer for RFP Win usage metering.
//!
//! This crate provides the Account Record Store: accounts keyed by email, the
//! usage audit log, company profiles, and the record of the last monthly reset.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`, the production backend
//! - [`MemoryStore`]: process-local, for tests and local development
//! - `RocksStore`: embedded `RocksDB` (feature `rocksdb-backend`)
//!
//! # Counter updates
//!
//! `increment_usage` is a single atomic operation in every backend. Two
//! concurrent increments of the same account always add two.
//!
//! # Example
//!
//! ```no_run
//! use rfpwin_core::{Account, Email};
//! use rfpwin_store::{MemoryStore, Store};
//!
//! # async fn example() -> rfpwin_store::Result<()> {
//! let store = MemoryStore::new();
//! let email = Email::parse("a@x.com").unwrap();
//! store.insert_account(&Account::new(email.clone())).await?;
//!
//! let account = store.increment_usage(&email).await?;
//! assert_eq!(account.used, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use rfpwin_core::{Account, CompanyProfile, Email, PlanChange, UsageLogEntry, UsageReset};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer so the service can run against
/// PostgreSQL, `RocksDB`, or memory.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, email: &Email) -> Result<Option<Account>>;

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if an account with that email exists.
    async fn insert_account(&self, account: &Account) -> Result<()>;

    /// List accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<Account>>;

    /// Apply a plan change, creating the account if it does not exist.
    ///
    /// Returns the account as stored after the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn apply_plan_change(&self, email: &Email, change: &PlanChange) -> Result<Account>;

    /// Find the account holding a Stripe subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_account_by_subscription(&self, subscription_id: &str)
        -> Result<Option<Account>>;

    // =========================================================================
    // Usage Counter Operations
    // =========================================================================

    /// Atomically add one to an account's usage counter.
    ///
    /// Returns the account as stored after the increment.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    async fn increment_usage(&self, email: &Email) -> Result<Account>;

    /// Zero every account's usage counter in one bulk operation.
    ///
    /// Returns the number of accounts touched and remembers the reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn reset_all_usage(&self) -> Result<UsageReset>;

    /// Get the most recent monthly reset, if any ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn last_usage_reset(&self) -> Result<Option<UsageReset>>;

    // =========================================================================
    // Audit Log Operations
    // =========================================================================

    /// Append a usage audit row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()>;

    /// List an account's audit rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_usage_logs(
        &self,
        email: &Email,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UsageLogEntry>>;

    // =========================================================================
    // Company Profile Operations
    // =========================================================================

    /// Insert or replace a company profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_company_profile(&self, profile: &CompanyProfile) -> Result<()>;

    /// Get a company profile by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_company_profile(&self, id: &str) -> Result<Option<CompanyProfile>>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn ping(&self) -> Result<()>;
}
