//! RFP Win metering client SDK.
//!
//! The analysis and proposal services use this crate to ask the metering
//! service whether a billable action may run, and to record it afterwards.
//!
//! # Example
//!
//! ```no_run
//! use rfpwin_client::{ActionKind, ClientError, MeteringClient};
//!
//! # async fn example() -> Result<(), ClientError> {
//! let client = MeteringClient::new(
//!     "http://rfpwin-metering.billing.svc:8080",
//!     "your-service-api-key",
//! )?;
//!
//! let check = client
//!     .check_usage_limit("founder@acme.io", ActionKind::RfpAnalysis)
//!     .await?;
//!
//! if check.allowed {
//!     // ... run the analysis ...
//!     let record = client
//!         .log_usage("founder@acme.io", ActionKind::RfpAnalysis, None)
//!         .await?;
//!     println!("{} analyses left this month", record.remaining);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, MeteringClient};
pub use error::ClientError;
pub use rfpwin_core::{ActionKind, PlanInfo, PlanType, UsageCheck};
pub use types::*;
