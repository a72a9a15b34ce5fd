//! Column families used by the `RocksDB` backend.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account records, keyed by email.
    pub const ACCOUNTS: &str = "accounts";

    /// Usage audit rows, keyed by log ID (ULID).
    pub const USAGE_LOGS: &str = "usage_logs";

    /// Index: audit rows by account, keyed by `email || 0x00 || log_id`.
    /// Value is empty (index only).
    pub const USAGE_LOGS_BY_EMAIL: &str = "usage_logs_by_email";

    /// Company profiles, keyed by profile ID.
    pub const COMPANY_PROFILES: &str = "company_profiles";

    /// Singleton records such as the last usage reset.
    pub const META: &str = "meta";
}

/// Key of the last usage reset in [`cf::META`].
pub const LAST_RESET_KEY: &[u8] = b"last_usage_reset";

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::USAGE_LOGS,
        cf::USAGE_LOGS_BY_EMAIL,
        cf::COMPANY_PROFILES,
        cf::META,
    ]
}
