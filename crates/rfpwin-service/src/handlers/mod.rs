//! API handlers.

pub mod accounts;
pub mod admin;
pub mod company;
pub mod health;
pub mod plans;
pub mod usage;
pub mod webhooks;

use serde::Deserialize;

use rfpwin_core::Email;

use crate::error::ApiError;

/// Default page size for list endpoints.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may ask for.
const MAX_PAGE_SIZE: usize = 500;

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Page size (default 50, capped at 500).
    pub limit: Option<usize>,
    /// Rows to skip.
    pub offset: Option<usize>,
}

impl PageQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

fn parse_email(raw: &str) -> Result<Email, ApiError> {
    Email::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}
