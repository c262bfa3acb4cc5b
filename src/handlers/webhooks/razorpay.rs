use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::db::AppState;
use crate::payments::{RazorpayClient, RazorpayWebhookEvent};

use super::common::{
    handle_webhook, split_product_ids, PaymentCapturedData, WebhookEvent, WebhookProvider,
    WebhookResult,
};

/// Razorpay webhook provider implementation.
pub struct RazorpayWebhookProvider;

impl WebhookProvider for RazorpayWebhookProvider {
    fn provider_name(&self) -> &'static str {
        "razorpay"
    }

    fn extract_signature(&self, headers: &HeaderMap) -> Result<String, WebhookResult> {
        headers
            .get("x-razorpay-signature")
            .ok_or((StatusCode::BAD_REQUEST, "Missing x-razorpay-signature header"))?
            .to_str()
            .map(|s| s.to_string())
            .map_err(|e| {
                tracing::debug!("Invalid UTF-8 in Razorpay signature header: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid signature header")
            })
    }

    fn verify_signature(
        &self,
        state: &AppState,
        body: &Bytes,
        signature: &str,
    ) -> Result<bool, WebhookResult> {
        let config = match state.razorpay.as_ref() {
            Some(config) => config,
            None => return Err((StatusCode::OK, "Razorpay not configured")),
        };

        let client = RazorpayClient::new(config);
        client.verify_webhook_signature(body, signature).map_err(|e| {
            tracing::error!("Signature verification error: {}", e);
            (StatusCode::BAD_REQUEST, "Signature verification failed")
        })
    }

    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent, WebhookResult> {
        let event: RazorpayWebhookEvent = serde_json::from_slice(body).map_err(|e| {
            tracing::error!("Failed to parse Razorpay webhook: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid JSON")
        })?;

        match event.event.as_str() {
            "payment.captured" => parse_payment_captured(&event),
            _ => Ok(WebhookEvent::Ignored),
        }
    }
}

fn parse_payment_captured(event: &RazorpayWebhookEvent) -> Result<WebhookEvent, WebhookResult> {
    let payment = event
        .payload
        .payment
        .as_ref()
        .map(|wrapper| &wrapper.entity)
        .ok_or((StatusCode::BAD_REQUEST, "Invalid webhook payload"))?;

    // The event name is authoritative, but entities carry their own
    // status; a disagreement means a malformed delivery.
    if payment.status != "captured" {
        return Ok(WebhookEvent::Ignored);
    }

    let user_id = payment
        .notes
        .user_id
        .clone()
        .ok_or((StatusCode::BAD_REQUEST, "Invalid webhook payload"))?;
    let tenant_slug = payment
        .notes
        .tenant_slug
        .clone()
        .ok_or((StatusCode::BAD_REQUEST, "Invalid webhook payload"))?;
    let product_ids = split_product_ids(payment.notes.product_ids.as_deref().unwrap_or(""));
    if product_ids.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Invalid webhook payload"));
    }

    Ok(WebhookEvent::PaymentCaptured(PaymentCapturedData {
        provider_session_id: payment.id.clone(),
        user_id,
        tenant_slug,
        product_ids,
        checkout_session_id: payment.notes.checkout_session_id.clone(),
        amount_cents: Some(payment.amount),
    }))
}

/// Axum handler for Razorpay webhooks.
pub async fn handle_razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle_webhook(&RazorpayWebhookProvider, &state, headers, body).await
}
