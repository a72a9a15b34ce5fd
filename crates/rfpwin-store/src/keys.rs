//! Key encoding utilities for `RocksDB`.

use rfpwin_core::{Email, UsageLogId};

/// Separates the email from the log ID in index keys. Never valid in an email.
const SEPARATOR: u8 = 0x00;

/// Create an account key from an email.
#[must_use]
pub fn account_key(email: &Email) -> Vec<u8> {
    email.as_bytes().to_vec()
}

/// Create a usage log key from a log ID.
#[must_use]
pub fn usage_log_key(id: &UsageLogId) -> Vec<u8> {
    id.to_bytes().to_vec()
}

/// Create an account/usage-log index key.
///
/// Format: `email || 0x00 || log_id (16 bytes)`
///
/// ULIDs are time-ordered, so one account's rows sort by time.
#[must_use]
pub fn email_usage_log_key(email: &Email, id: &UsageLogId) -> Vec<u8> {
    let mut key = email_usage_logs_prefix(email);
    key.extend_from_slice(&id.to_bytes());
    key
}

/// Create a prefix for iterating all usage rows of one account.
#[must_use]
pub fn email_usage_logs_prefix(email: &Email) -> Vec<u8> {
    let mut key = Vec::with_capacity(email.as_bytes().len() + 17);
    key.extend_from_slice(email.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Extract the log ID from an index key.
///
/// Returns `None` if the key is shorter than a log ID.
#[must_use]
pub fn extract_log_id(key: &[u8]) -> Option<UsageLogId> {
    let start = key.len().checked_sub(16)?;
    let bytes: [u8; 16] = key[start..].try_into().ok()?;
    Some(UsageLogId::from_bytes(bytes))
}

/// Create a company profile key.
#[must_use]
pub fn company_profile_key(id: &str) -> Vec<u8> {
    id.as_bytes().to_vec()
}
