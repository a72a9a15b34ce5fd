//! Stripe integration.
//!
//! Stripe is the payment platform: it sends checkout and subscription events
//! to `/webhooks/stripe`, and the service reads subscription periods back.

pub mod client;
pub mod types;

pub use client::{verify_signature, StripeClient, StripeError};
pub use types::*;
