use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::db::AppState;
use crate::payments::{StripeCheckoutSession, StripeClient, StripeWebhookEvent};

use super::common::{
    handle_webhook, split_product_ids, PaymentCapturedData, WebhookEvent, WebhookProvider,
    WebhookResult,
};

/// Stripe webhook provider implementation.
pub struct StripeWebhookProvider;

impl WebhookProvider for StripeWebhookProvider {
    fn provider_name(&self) -> &'static str {
        "stripe"
    }

    fn extract_signature(&self, headers: &HeaderMap) -> Result<String, WebhookResult> {
        headers
            .get("stripe-signature")
            .ok_or((StatusCode::BAD_REQUEST, "Missing stripe-signature header"))?
            .to_str()
            .map(|s| s.to_string())
            .map_err(|e| {
                tracing::debug!("Invalid UTF-8 in Stripe signature header: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid signature header")
            })
    }

    fn verify_signature(
        &self,
        state: &AppState,
        body: &Bytes,
        signature: &str,
    ) -> Result<bool, WebhookResult> {
        // A missing config answers 200 OK: a 5xx would have Stripe retry
        // indefinitely, and the response should not leak config state.
        let config = match state.stripe.as_ref() {
            Some(config) => config,
            None => return Err((StatusCode::OK, "Stripe not configured")),
        };

        let client = StripeClient::new(config);
        client.verify_webhook_signature(body, signature).map_err(|e| {
            tracing::error!("Signature verification error: {}", e);
            (StatusCode::BAD_REQUEST, "Signature verification failed")
        })
    }

    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent, WebhookResult> {
        let event: StripeWebhookEvent = serde_json::from_slice(body).map_err(|e| {
            tracing::error!("Failed to parse Stripe webhook: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid JSON")
        })?;

        match event.event_type.as_str() {
            "checkout.session.completed" => parse_checkout_completed(&event),
            _ => Ok(WebhookEvent::Ignored),
        }
    }
}

fn parse_checkout_completed(event: &StripeWebhookEvent) -> Result<WebhookEvent, WebhookResult> {
    let session: StripeCheckoutSession = serde_json::from_value(event.data.object.clone())
        .map_err(|e| {
            tracing::error!("Failed to parse checkout session: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid checkout session")
        })?;

    // Async payment methods complete the session before capture; only a
    // paid session materializes orders.
    if session.payment_status != "paid" {
        return Ok(WebhookEvent::Ignored);
    }

    let user_id = session
        .metadata
        .user_id
        .clone()
        .ok_or((StatusCode::BAD_REQUEST, "Invalid webhook payload"))?;
    let tenant_slug = session
        .metadata
        .tenant_slug
        .clone()
        .ok_or((StatusCode::BAD_REQUEST, "Invalid webhook payload"))?;
    let product_ids = split_product_ids(session.metadata.product_ids.as_deref().unwrap_or(""));
    if product_ids.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Invalid webhook payload"));
    }

    Ok(WebhookEvent::PaymentCaptured(PaymentCapturedData {
        provider_session_id: session.id.clone(),
        user_id,
        tenant_slug,
        product_ids,
        checkout_session_id: session.metadata.checkout_session_id.clone(),
        amount_cents: session.amount_total,
    }))
}

/// Axum handler for Stripe webhooks.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle_webhook(&StripeWebhookProvider, &state, headers, body).await
}
