//! Common webhook handling infrastructure for payment providers.
//!
//! A trait-based approach unifies the Stripe and Razorpay webhook
//! handlers: providers do signature extraction/verification and event
//! parsing, the shared pipeline does re-validation and idempotent order
//! creation. This module is the sole writer of the order ledger.

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
};
use rusqlite::Connection;

use crate::db::{queries, AppState};
use crate::error::AppError;
use crate::models::{CreateOrder, ProductWithTenant};

/// Result type for webhook operations. The status code is for the
/// provider's retry logic, never for an end user: success suppresses
/// redelivery, failure invites it.
pub type WebhookResult = (StatusCode, &'static str);

/// Helper to unwrap DB query results with consistent error handling.
///
/// Not-found acknowledges the event (redelivery cannot make the record
/// exist); a DB error asks for a retry.
fn db_lookup<T>(
    result: Result<Option<T>, AppError>,
    not_found_msg: &'static str,
) -> Result<T, WebhookResult> {
    match result {
        Ok(Some(v)) => Ok(v),
        Ok(None) => Err((StatusCode::OK, not_found_msg)),
        Err(e) => {
            tracing::error!("DB error: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Database error"))
        }
    }
}

/// Data extracted from a capture event, the provider-agnostic vocabulary
/// of the reconciler. Only identifiers are carried over; names and prices
/// are re-derived from the catalog.
#[derive(Debug)]
pub struct PaymentCapturedData {
    /// The provider's session/payment id; becomes the order's
    /// `payment_session_id` and the idempotency key.
    pub provider_session_id: String,
    pub user_id: String,
    pub tenant_slug: String,
    pub product_ids: Vec<String>,
    /// Our pending-purchase record, when the metadata carried it.
    pub checkout_session_id: Option<String>,
    /// Amount as reported by the provider - logged for reconciliation
    /// visibility, never written to the ledger.
    pub amount_cents: Option<i64>,
}

/// Parsed webhook event with provider-agnostic data.
#[derive(Debug)]
pub enum WebhookEvent {
    /// A successfully captured payment - materializes orders.
    PaymentCaptured(PaymentCapturedData),
    /// Event type not relevant to order reconciliation. Acknowledged so
    /// the provider stops redelivering.
    Ignored,
}

/// Trait for payment provider webhook handling.
///
/// Implementors provide provider-specific signature and parsing logic,
/// while the common pipeline handles validation and order creation.
pub trait WebhookProvider: Send + Sync {
    /// Provider name for logging (e.g., "stripe", "razorpay")
    fn provider_name(&self) -> &'static str;

    /// Extract the signature from request headers.
    fn extract_signature(&self, headers: &HeaderMap) -> Result<String, WebhookResult>;

    /// Verify the webhook signature over the raw body.
    ///
    /// `Ok(false)` means the signature did not match; an `Err` carries the
    /// response for config/format problems.
    fn verify_signature(
        &self,
        state: &AppState,
        body: &Bytes,
        signature: &str,
    ) -> Result<bool, WebhookResult>;

    /// Parse the verified body into a provider-agnostic event.
    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent, WebhookResult>;
}

/// Split comma-joined product ids from provider metadata/notes.
///
/// Deduplicated: the reconciler materializes one order per product, so a
/// repeated id in the metadata is meaningless here.
pub fn split_product_ids(joined: &str) -> Vec<String> {
    let mut ids: Vec<String> = joined
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}

/// Materialize orders for a captured payment - the only place orders are
/// written.
///
/// Everything happens inside one SQL transaction:
/// - the checkout-session claim (compare-and-swap) makes redelivery a
///   no-op on the fast path;
/// - `INSERT OR IGNORE` against the `(payment_session_id, product_id)`
///   unique index guarantees at-most-once per product even when two
///   deliveries race past the claim (or when no local session exists);
/// - a failure rolls back the claim too, so the provider's retry gets a
///   clean slate.
pub fn process_payment_captured(
    conn: &mut Connection,
    provider: &str,
    data: &PaymentCapturedData,
    products: &[ProductWithTenant],
) -> WebhookResult {
    let tx = match conn.transaction() {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!("Failed to start transaction: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    // Claim the pending purchase first, if the metadata named one we know.
    if let Some(ref session_id) = data.checkout_session_id {
        match queries::get_checkout_session(&tx, session_id) {
            Ok(Some(_)) => match queries::try_claim_checkout_session(&tx, session_id) {
                Ok(true) => {}
                Ok(false) => {
                    // Another delivery got here first; nothing to commit.
                    return (StatusCode::OK, "Already processed");
                }
                Err(e) => {
                    tracing::error!("Failed to claim checkout session: {}", e);
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
                }
            },
            Ok(None) => {
                // Session purged or created elsewhere; the unique index on
                // orders still guarantees idempotency below.
                tracing::warn!(
                    "{} webhook references unknown checkout session {}",
                    provider,
                    session_id
                );
            }
            Err(e) => {
                tracing::error!("Failed to load checkout session: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        }
    }

    let mut created = 0usize;
    for found in products {
        let input = CreateOrder {
            user_id: data.user_id.clone(),
            product_id: found.product.id.clone(),
            // Name snapshot from the catalog as of reconciliation time;
            // the event's embedded names are never trusted.
            name: found.product.name.clone(),
            payment_session_id: data.provider_session_id.clone(),
            payout_account_id: Some(found.tenant.payout_account_id.clone()),
        };
        match queries::insert_order_if_absent(&tx, &input) {
            Ok(true) => created += 1,
            Ok(false) => {
                tracing::debug!(
                    "Order already exists for session {} product {}",
                    data.provider_session_id,
                    found.product.id
                );
            }
            Err(e) => {
                tracing::error!("Failed to create order: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create order");
            }
        }
    }

    if let Err(e) = tx.commit() {
        tracing::error!("Failed to commit transaction: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
    }

    tracing::info!(
        "{} payment captured: session={}, user={}, orders_created={}, amount={:?}",
        provider,
        data.provider_session_id,
        data.user_id,
        created,
        data.amount_cents
    );

    (StatusCode::OK, "OK")
}

/// Generic webhook handler driving the full pipeline:
/// signature -> parse -> filter -> extract -> re-validate -> create.
///
/// No step runs before the prior one succeeds; in particular the body is
/// never parsed when the signature does not verify.
pub async fn handle_webhook<P: WebhookProvider>(
    provider: &P,
    state: &AppState,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult {
    let signature = match provider.extract_signature(&headers) {
        Ok(sig) => sig,
        Err(result) => return result,
    };

    match provider.verify_signature(state, &body, &signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("{} webhook signature mismatch", provider.provider_name());
            return (StatusCode::BAD_REQUEST, "Invalid signature");
        }
        Err(result) => return result,
    }

    let event = match provider.parse_event(&body) {
        Ok(event) => event,
        Err(result) => return result,
    };

    let data = match event {
        WebhookEvent::PaymentCaptured(data) => data,
        WebhookEvent::Ignored => return (StatusCode::OK, "Ignored"),
    };

    let mut conn = match state.db.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get DB connection: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    // Re-validate against the catalog. The event is only trusted for
    // identifiers; a delayed delivery must not resurrect stale prices or
    // names, and a forged id set must not cross tenants.
    let user = match db_lookup(
        queries::get_user_by_id(&conn, &data.user_id),
        "User not found",
    ) {
        Ok(user) => user,
        Err(result) => {
            tracing::warn!(
                "{} webhook for unknown user {}",
                provider.provider_name(),
                data.user_id
            );
            return result;
        }
    };

    let products = match queries::get_products_for_tenant(&conn, &data.product_ids, &data.tenant_slug)
    {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("DB error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    if products.len() != data.product_ids.len() {
        // Retrying will not make the products exist; acknowledge with
        // zero orders and leave the trail in the log.
        tracing::warn!(
            "{} webhook product mismatch for user {}: requested {} under tenant '{}', found {}",
            provider.provider_name(),
            user.id,
            data.product_ids.len(),
            data.tenant_slug,
            products.len()
        );
        return (StatusCode::OK, "Products not found");
    }

    process_payment_captured(&mut conn, provider.provider_name(), &data, &products)
}
