//! Stripe webhook relay.
//!
//! Payment events are turned into plan changes on the account record.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use rfpwin_core::{Email, PlanType};

use crate::error::ApiError;
use crate::metering::SubscriptionInfo;
use crate::state::AppState;
use crate::stripe::{verify_signature, CheckoutSession, Subscription, WebhookEvent};

/// Webhook response.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Handle Stripe webhooks.
///
/// Events without a valid `Stripe-Signature` are rejected. When no webhook
/// secret is configured every event is rejected.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Some(secret) = state.config.stripe_webhook_secret.as_deref() else {
        tracing::warn!("Stripe webhook received but no webhook secret is configured");
        return Err(ApiError::Unauthorized);
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

    verify_signature(secret, &body, signature).map_err(|e| {
        tracing::warn!(error = %e, "Invalid Stripe webhook signature");
        ApiError::BadRequest("Invalid webhook signature".into())
    })?;

    let event: WebhookEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Received Stripe webhook"
    );

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            handle_checkout_completed(&state, event.data.object).await?;
        }
        "customer.subscription.updated" => {
            handle_subscription_updated(&state, event.data.object).await?;
        }
        "customer.subscription.deleted" => {
            handle_subscription_deleted(&state, event.data.object).await?;
        }
        _ => {
            tracing::debug!(event_type = %event.event_type, "Unhandled Stripe event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// Upgrade the paying account and reset its usage.
///
/// Sessions without an email or a subscription are acknowledged and ignored.
/// The plan is inferred from the amount charged. The period comes from the
/// Stripe API when a client is configured; a failed fetch is logged and the
/// upgrade still happens.
async fn handle_checkout_completed(
    state: &AppState,
    object: serde_json::Value,
) -> Result<(), ApiError> {
    let session: CheckoutSession =
        serde_json::from_value(object).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let Some(raw_email) = session.email() else {
        tracing::warn!(session_id = %session.id, "Checkout session has no customer email, ignoring");
        return Ok(());
    };
    if session.subscription.is_none() {
        tracing::warn!(session_id = %session.id, "Checkout session has no subscription, ignoring");
        return Ok(());
    }
    let email = Email::parse(raw_email).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let plan = PlanType::from_checkout_amount_cents(session.amount_total.unwrap_or(0));

    let mut info = SubscriptionInfo {
        customer_id: session.customer.clone(),
        subscription_id: session.subscription.clone(),
        ..SubscriptionInfo::default()
    };

    if let (Some(stripe), Some(subscription_id)) = (&state.stripe, &session.subscription) {
        match stripe.get_subscription(subscription_id).await {
            Ok(sub) => {
                info.period_start = sub.period_start();
                info.period_end = sub.period_end();
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "Failed to fetch subscription period - continuing without"
                );
            }
        }
    }

    state.meter.apply_plan(&email, plan, info).await?;

    tracing::info!(
        session_id = %session.id,
        email = %email,
        plan = %plan,
        amount_total = ?session.amount_total,
        "Checkout completed, plan upgraded"
    );
    Ok(())
}

/// Mirror a subscription's status and period onto the account holding it.
async fn handle_subscription_updated(
    state: &AppState,
    object: serde_json::Value,
) -> Result<(), ApiError> {
    let sub: Subscription =
        serde_json::from_value(object).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let updated = state
        .meter
        .update_subscription(&sub.id, &sub.status, sub.period_start(), sub.period_end())
        .await?;

    if updated.is_none() {
        tracing::warn!(subscription_id = %sub.id, "Subscription update for unknown subscription");
    }
    Ok(())
}

/// Downgrade the account holding a deleted subscription.
async fn handle_subscription_deleted(
    state: &AppState,
    object: serde_json::Value,
) -> Result<(), ApiError> {
    let sub: Subscription =
        serde_json::from_value(object).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if state.meter.cancel_subscription(&sub.id).await?.is_none() {
        tracing::warn!(subscription_id = %sub.id, "Subscription deletion for unknown subscription");
    }
    Ok(())
}
