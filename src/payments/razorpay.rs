use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::RazorpayConfig;
use crate::error::{msg, AppError, Result};

use super::{LineItem, SessionMetadata};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    /// Total in minor units (paise for INR).
    amount: i64,
    currency: String,
    /// Our checkout session id, for cross-referencing in the dashboard.
    receipt: String,
    notes: OrderNotes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    transfers: Vec<OrderTransfer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderNotes {
    pub user_id: String,
    pub tenant_slug: String,
    /// Comma-joined product ids.
    pub product_ids: String,
    pub checkout_session_id: String,
}

/// Razorpay Route transfer: the tenant's cut of the order, sent to their
/// linked account. What is not transferred stays with the platform as the
/// fee.
#[derive(Debug, Serialize)]
struct OrderTransfer {
    account: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Create a Razorpay order for the client-SDK modal flow.
    ///
    /// Razorpay has no per-line-item pricing on orders; the amount is the
    /// validated total and the line items travel through `notes` for the
    /// webhook reconciler. The tenant's share (total minus platform fee)
    /// is routed via a Route transfer to their linked account.
    pub async fn create_order(
        &self,
        line_items: &[LineItem],
        total_cents: i64,
        currency: &str,
        fee_cents: i64,
        metadata: &SessionMetadata,
    ) -> Result<RazorpayOrder> {
        let payout_account_id = line_items
            .first()
            .map(|item| item.payout_account_id.clone())
            .ok_or_else(|| AppError::BadRequest(msg::CART_EMPTY.into()))?;

        let request = CreateOrderRequest {
            amount: total_cents,
            currency: currency.to_uppercase(),
            receipt: metadata.checkout_session_id.clone(),
            notes: OrderNotes {
                user_id: metadata.user_id.clone(),
                tenant_slug: metadata.tenant_slug.clone(),
                product_ids: metadata.product_ids.clone(),
                checkout_session_id: metadata.checkout_session_id.clone(),
            },
            transfers: vec![OrderTransfer {
                account: payout_account_id,
                amount: total_cents - fee_cents,
                currency: currency.to_uppercase(),
            }],
        };

        let response = self
            .client
            .post("https://api.razorpay.com/v1/orders")
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Razorpay API error: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Razorpay response: {}", e)))
    }

    /// Verify the `x-razorpay-signature` header: HMAC-SHA256 over the raw
    /// body, hex-encoded, compared in constant time. Razorpay's scheme has
    /// no timestamp component.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.as_bytes();

        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Generic Razorpay webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct RazorpayWebhookEvent {
    pub event: String,
    pub payload: RazorpayEventPayload,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayEventPayload {
    pub payment: Option<RazorpayPaymentWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayPaymentWrapper {
    pub entity: RazorpayPaymentEntity,
}

// ============ payment.captured ============

#[derive(Debug, Deserialize)]
pub struct RazorpayPaymentEntity {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub order_id: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub notes: RazorpayPaymentNotes,
}

/// Notes round-tripped from order creation. All optional on the way back
/// in - never trust the provider to echo faithfully.
#[derive(Debug, Default, Deserialize)]
pub struct RazorpayPaymentNotes {
    pub user_id: Option<String>,
    pub tenant_slug: Option<String>,
    pub product_ids: Option<String>,
    pub checkout_session_id: Option<String>,
}
