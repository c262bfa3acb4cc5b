//! Payment provider adapters.
//!
//! Both providers expose the same two capabilities: create a hosted
//! payment session for a set of line items (with the platform fee split
//! out to the tenant's payout account), and verify the authenticity of an
//! inbound webhook body. The checkout handler and webhook reconciler are
//! written against this shared vocabulary; everything provider-specific
//! stays in `stripe.rs` / `razorpay.rs`.

mod razorpay;
mod stripe;

pub use razorpay::*;
pub use stripe::*;

use std::str::FromStr;

/// One priced unit within a payment session, corresponding to one
/// product. Rebuilt fresh on every checkout attempt from current catalog
/// prices - never cached, never trusted from the client.
#[derive(Debug, Clone)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    /// Current catalog price in minor currency units.
    pub unit_price_cents: i64,
    /// The owning tenant's payout destination.
    pub payout_account_id: String,
}

/// Opaque metadata attached to a provider session, sufficient to
/// reconstruct the purchase at webhook time without re-querying the
/// original request.
#[derive(Debug, Clone)]
pub struct SessionMetadata {
    pub user_id: String,
    pub tenant_slug: String,
    /// Comma-joined product ids.
    pub product_ids: String,
    /// Our server-side pending-purchase record.
    pub checkout_session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe,
    Razorpay,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Razorpay => "razorpay",
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stripe" => Ok(PaymentProvider::Stripe),
            "razorpay" => Ok(PaymentProvider::Razorpay),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_round_trip() {
        for provider in [PaymentProvider::Stripe, PaymentProvider::Razorpay] {
            assert_eq!(provider.as_str().parse::<PaymentProvider>(), Ok(provider));
        }
        assert!("paypal".parse::<PaymentProvider>().is_err());
        assert_eq!("STRIPE".parse::<PaymentProvider>(), Ok(PaymentProvider::Stripe));
    }
}
