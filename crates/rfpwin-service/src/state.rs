//! Application state.

use std::sync::Arc;

use rfpwin_store::Store;

use crate::config::ServiceConfig;
use crate::metering::UsageMeter;
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Gate, recorder and reset over `store`.
    pub meter: UsageMeter,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Stripe client for reading subscriptions (optional).
    pub stripe: Option<Arc<StripeClient>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let stripe = config.stripe_api_key.as_ref().and_then(|key| {
            match StripeClient::new(key) {
                Ok(client) => {
                    tracing::info!("Stripe integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Stripe client");
                    None
                }
            }
        });

        if stripe.is_none() {
            tracing::warn!("Stripe not configured - subscription periods will not be fetched");
        }
        if config.stripe_webhook_secret.is_none() {
            tracing::warn!("Stripe webhook secret not configured - /webhooks/stripe will reject all events");
        }

        let meter = UsageMeter::new(store.clone(), config.metering);

        Self {
            store,
            meter,
            config,
            stripe,
        }
    }

    /// Replace the Stripe client.
    #[must_use]
    pub fn with_stripe(mut self, client: StripeClient) -> Self {
        self.stripe = Some(Arc::new(client));
        self
    }
}
