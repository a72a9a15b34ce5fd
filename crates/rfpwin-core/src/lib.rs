//! Core types and utilities for RFP Win usage metering.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `Email`, `UsageLogId`
//! - **Plans**: `PlanType`, `quota_for`, the plan catalog
//! - **Accounts**: `Account`, `PlanChange`
//! - **Usage**: `ActionKind`, `UsageCheck`, `UsageLogEntry`, `UsageReset`
//! - **Company profiles**: `CompanyProfile`
//!
//! # Quota model
//!
//! Each account holds a `used` counter and a monthly `quota`. A billable action
//! is allowed while `used < quota`. Document analysis and proposal generation
//! draw from the same counter.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod company;
pub mod error;
pub mod ids;
pub mod plan;
pub mod usage;

pub use account::{Account, PlanChange, STATUS_ACTIVE, STATUS_CANCELED};
pub use company::{CompanyProfile, DEFAULT_PROFILE_ID};
pub use error::{BillingError, Result};
pub use ids::{Email, IdError, UsageLogId};
pub use plan::{
    catalog, quota_for, PlanInfo, PlanType, BASIC_QUOTA, ENTERPRISE_QUOTA, FREE_QUOTA, PRO_QUOTA,
};
pub use usage::{ActionKind, UsageCheck, UsageLogEntry, UsageReset};
