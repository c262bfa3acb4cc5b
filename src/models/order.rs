use serde::{Deserialize, Serialize};

/// A completed purchase of one product by one buyer.
///
/// The order ledger is append-only and is the system of record for "does
/// buyer own product" (the library). Orders are written only by the
/// webhook reconciler, never by checkout - the buyer may abandon payment
/// after a session is created.
///
/// `(payment_session_id, product_id)` is unique: webhook redelivery and
/// concurrent delivery of the same capture event collapse to one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Weak reference - the product may be deleted from the catalog later;
    /// the order (and the `name` snapshot) survives.
    pub product_id: String,
    /// Product name at reconciliation time.
    pub name: String,
    /// The provider's session/payment identifier (Stripe `cs_...`,
    /// Razorpay `pay_...`).
    pub payment_session_id: String,
    /// Tenant payout account the payment was routed to.
    pub payout_account_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug)]
pub struct CreateOrder {
    pub user_id: String,
    pub product_id: String,
    pub name: String,
    pub payment_session_id: String,
    pub payout_account_id: Option<String>,
}
