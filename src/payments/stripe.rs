use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::StripeConfig;
use crate::error::{msg, AppError, Result};

use super::{LineItem, SessionMetadata};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Create a Stripe hosted checkout session.
    ///
    /// One `line_items[i]` with ad-hoc `price_data` per line item (prices
    /// come from our catalog, not the Stripe dashboard - tenants manage
    /// products here, not in Stripe). The platform fee is passed as
    /// `application_fee_amount` with `transfer_data[destination]` set to
    /// the tenant's connected account, so Stripe splits the payout
    /// automatically.
    ///
    /// Returns `(session_id, checkout_url)`.
    pub async fn create_checkout_session(
        &self,
        line_items: &[LineItem],
        currency: &str,
        fee_cents: i64,
        buyer_email: &str,
        success_url: &str,
        cancel_url: &str,
        metadata: &SessionMetadata,
    ) -> Result<(String, String)> {
        let payout_account_id = line_items
            .first()
            .map(|item| item.payout_account_id.clone())
            .ok_or_else(|| AppError::BadRequest(msg::CART_EMPTY.into()))?;

        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), success_url.into()),
            ("cancel_url".into(), cancel_url.into()),
            ("customer_email".into(), buyer_email.into()),
            (
                "payment_intent_data[application_fee_amount]".into(),
                fee_cents.to_string(),
            ),
            (
                "payment_intent_data[transfer_data][destination]".into(),
                payout_account_id,
            ),
            ("metadata[user_id]".into(), metadata.user_id.clone()),
            ("metadata[tenant_slug]".into(), metadata.tenant_slug.clone()),
            ("metadata[product_ids]".into(), metadata.product_ids.clone()),
            (
                "metadata[checkout_session_id]".into(),
                metadata.checkout_session_id.clone(),
            ),
        ];

        for (i, item) in line_items.iter().enumerate() {
            form.push((
                format!("line_items[{}][price_data][currency]", i),
                currency.into(),
            ));
            form.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                item.unit_price_cents.to_string(),
            ));
            form.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.name.clone(),
            ));
            form.push((format!("line_items[{}][quantity]", i), "1".into()));
        }

        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("Stripe API error: {}", error_text)));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Stripe response: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| AppError::Provider(msg::SESSION_URL_MISSING.into()))?;

        Ok((session.id, url))
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Stripe signature format: t=timestamp,v1=signature
        let parts: Vec<&str> = signature.split(',').collect();

        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in parts {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        // Parse and validate timestamp to prevent replay attacks.
        // Reject webhooks older than WEBHOOK_TIMESTAMP_TOLERANCE_SECS.
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Also reject timestamps from the future (clock skew tolerance: 60 seconds)
        if age < -60 {
            tracing::warn!(
                "Stripe webhook rejected: timestamp in the future (age={}s)",
                age
            );
            return Ok(false);
        }

        // Construct signed payload
        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        // Compute expected signature
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison. Signature length is not secret (always
        // 64 hex chars for SHA-256), so the length check may short-circuit.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Generic Stripe webhook event - object is parsed based on event_type
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

// ============ checkout.session.completed ============

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: StripeMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeMetadata {
    pub user_id: Option<String>,
    pub tenant_slug: Option<String>,
    /// Comma-joined product ids.
    pub product_ids: Option<String>,
    pub checkout_session_id: Option<String>,
}
