use serde::{Deserialize, Serialize};

/// A pending purchase, recorded server-side at checkout time.
///
/// Keyed by our own id (passed to the provider as metadata), so the
/// webhook reconciler can claim it without round-tripping the full
/// purchase through provider metadata. `completed` is flipped by a
/// compare-and-swap when the capture webhook lands; a session that is
/// already completed means the event was processed before.
///
/// Abandoned sessions (never completed) are purged after a retention
/// window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub user_id: String,
    pub tenant_slug: String,
    pub product_ids: Vec<String>,
    /// Total charged, in minor units, as priced at session creation.
    pub amount_cents: i64,
    /// Platform fee retained out of `amount_cents`.
    pub fee_cents: i64,
    pub currency: String,
    /// Which provider the session was created with ("stripe"/"razorpay").
    pub provider: String,
    /// The provider's session/order id, recorded once the provider call
    /// succeeds.
    pub provider_session_id: Option<String>,
    pub completed: bool,
    pub created_at: i64,
}

#[derive(Debug)]
pub struct CreateCheckoutSession {
    pub user_id: String,
    pub tenant_slug: String,
    pub product_ids: Vec<String>,
    pub amount_cents: i64,
    pub fee_cents: i64,
    pub currency: String,
    pub provider: String,
}
