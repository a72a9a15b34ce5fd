//! Company profiles used when drafting proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile ID used when the caller does not supply one.
pub const DEFAULT_PROFILE_ID: &str = "default-company";

/// A company's capabilities and background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Profile key.
    pub id: String,

    /// Company name.
    pub name: String,

    /// What the company can deliver.
    pub capabilities: Vec<String>,

    /// Everything else (team size, certifications, contact info, past projects).
    #[serde(default)]
    pub details: serde_json::Value,

    /// When the profile was last saved.
    pub updated_at: DateTime<Utc>,
}

impl CompanyProfile {
    /// The empty profile returned for ids with nothing stored yet.
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            capabilities: Vec::new(),
            details: serde_json::json!({}),
            updated_at: Utc::now(),
        }
    }
}
