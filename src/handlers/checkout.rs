use axum::extract::State;
use axum::Extension;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::{Json, Query};
use crate::middleware::CurrentUser;
use crate::models::{CreateCheckoutSession, ProductWithTenant};
use crate::payments::{LineItem, PaymentProvider, RazorpayClient, SessionMetadata, StripeClient};

/// Platform fee on a purchase total, in minor units.
///
/// `fee_bps` is the fee in basis points (1000 = 10%). Round-half-up in
/// pure integer arithmetic so the figure matches the one the provider
/// derives - a floating-point fee invites off-by-one-cent settlement
/// mismatches.
pub fn platform_fee(total_cents: i64, fee_bps: i64) -> i64 {
    (total_cents * fee_bps + 5_000) / 10_000
}

/// Price the requested ids against the validated product set.
///
/// Each requested id (per occurrence - duplicates are permitted and priced
/// independently) is mapped to its product. Returns the line items and the
/// total.
pub fn build_line_items(
    requested_ids: &[String],
    products: &[ProductWithTenant],
) -> (Vec<LineItem>, i64) {
    let mut items = Vec::with_capacity(requested_ids.len());
    let mut total = 0i64;

    for id in requested_ids {
        if let Some(found) = products.iter().find(|p| &p.product.id == id) {
            total += found.product.price_cents;
            items.push(LineItem {
                product_id: found.product.id.clone(),
                name: found.product.name.clone(),
                unit_price_cents: found.product.price_cents,
                payout_account_id: found.tenant.payout_account_id.clone(),
            });
        }
    }

    (items, total)
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub tenant_slug: String,
    pub product_ids: Vec<String>,
}

/// Terminal shape depends on the provider: Stripe hosts the checkout page
/// (redirect), Razorpay opens a client-SDK modal fed by these fields.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PurchaseResponse {
    Redirect {
        session_id: String,
        checkout_url: String,
    },
    Modal {
        session_id: String,
        provider_order_id: String,
        amount_cents: i64,
        currency: String,
        buyer_email: String,
        buyer_name: String,
    },
}

/// Turn an authenticated buyer's cart into a provider-hosted payment
/// session. All economic validation happens here, before money moves; no
/// order is ever written here (the buyer may abandon payment).
pub async fn purchase(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>> {
    if request.product_ids.is_empty() {
        return Err(AppError::BadRequest(msg::CART_EMPTY.into()));
    }

    let conn = state.db.get()?;

    let tenant = queries::get_tenant_by_slug(&conn, &request.tenant_slug)
        .or_not_found(msg::TENANT_NOT_FOUND)?;

    // Existence + tenancy validation in one query: ids that don't exist
    // and ids belonging to a different tenant both surface as a count
    // mismatch, which blocks cross-tenant cart injection.
    let mut distinct_ids = request.product_ids.clone();
    distinct_ids.sort();
    distinct_ids.dedup();

    let products = queries::get_products_for_tenant(&conn, &distinct_ids, &tenant.slug)?;
    if products.len() != distinct_ids.len() {
        return Err(AppError::NotFound(msg::PRODUCTS_NOT_FOUND.into()));
    }

    // No settlement destination, no money movement.
    if !tenant.details_submitted {
        return Err(AppError::Forbidden(msg::TENANT_NOT_ONBOARDED.into()));
    }

    // Price from the catalog as it is right now; client-supplied amounts
    // are never part of the request.
    let (line_items, total_cents) = build_line_items(&request.product_ids, &products);
    let fee_cents = platform_fee(total_cents, state.platform_fee_bps);
    let currency = products[0].product.currency.clone();

    // Pending purchase, recorded before the provider call so the webhook
    // can reconstruct the purchase without trusting provider metadata
    // round-trips.
    let session = queries::create_checkout_session(
        &conn,
        &CreateCheckoutSession {
            user_id: user.id.clone(),
            tenant_slug: tenant.slug.clone(),
            product_ids: request.product_ids.clone(),
            amount_cents: total_cents,
            fee_cents,
            currency: currency.clone(),
            provider: state.payment_provider.as_str().to_string(),
        },
    )?;

    let metadata = SessionMetadata {
        user_id: user.id.clone(),
        tenant_slug: tenant.slug.clone(),
        product_ids: request.product_ids.join(","),
        checkout_session_id: session.id.clone(),
    };

    let response = match state.payment_provider {
        PaymentProvider::Stripe => {
            let config = state
                .stripe
                .as_ref()
                .ok_or_else(|| AppError::Internal(msg::PROVIDER_NOT_CONFIGURED.into()))?;

            let success_url = format!(
                "{}/tenants/{}/checkout?success=true",
                state.app_url, tenant.slug
            );
            let cancel_url = format!(
                "{}/tenants/{}/checkout?cancel=true",
                state.app_url, tenant.slug
            );

            let client = StripeClient::new(config);
            let (provider_session_id, checkout_url) = client
                .create_checkout_session(
                    &line_items,
                    &currency,
                    fee_cents,
                    &user.email,
                    &success_url,
                    &cancel_url,
                    &metadata,
                )
                .await?;

            queries::set_checkout_session_provider_id(&conn, &session.id, &provider_session_id)?;

            PurchaseResponse::Redirect {
                session_id: session.id,
                checkout_url,
            }
        }
        PaymentProvider::Razorpay => {
            let config = state
                .razorpay
                .as_ref()
                .ok_or_else(|| AppError::Internal(msg::PROVIDER_NOT_CONFIGURED.into()))?;

            let client = RazorpayClient::new(config);
            let order = client
                .create_order(&line_items, total_cents, &currency, fee_cents, &metadata)
                .await?;

            queries::set_checkout_session_provider_id(&conn, &session.id, &order.id)?;

            PurchaseResponse::Modal {
                session_id: session.id,
                provider_order_id: order.id,
                amount_cents: order.amount,
                currency: order.currency,
                buyer_email: user.email,
                buyer_name: user.name,
            }
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutProductsQuery {
    /// Comma-joined product ids from the client-held cart.
    pub ids: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutProductsResponse {
    pub docs: Vec<ProductWithTenant>,
    pub total_docs: i64,
    pub total_price_cents: i64,
    /// Ids the catalog no longer has. Carts persist client-side far longer
    /// than product availability; the caller prunes these.
    pub missing_ids: Vec<String>,
}

/// Cart validation view for the checkout page. Unknown ids are reported,
/// not fatal - the buyer decides whether to proceed without them.
pub async fn get_checkout_products(
    State(state): State<AppState>,
    Query(query): Query<CheckoutProductsQuery>,
) -> Result<Json<CheckoutProductsResponse>> {
    let ids: Vec<String> = query
        .ids
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let conn = state.db.get()?;
    let docs = queries::get_products_by_ids(&conn, &ids)?;

    let missing_ids: Vec<String> = ids
        .iter()
        .filter(|id| !docs.iter().any(|d| &d.product.id == *id))
        .cloned()
        .collect();

    let total_price_cents = docs.iter().map(|d| d.product.price_cents).sum();

    Ok(Json(CheckoutProductsResponse {
        total_docs: docs.len() as i64,
        docs,
        total_price_cents,
        missing_ids,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, Tenant};

    fn product_with_tenant(id: &str, name: &str, price_cents: i64) -> ProductWithTenant {
        ProductWithTenant {
            product: Product {
                id: id.to_string(),
                tenant_id: "bz_tnt_1".to_string(),
                category_id: None,
                name: name.to_string(),
                description: None,
                price_cents,
                currency: "usd".to_string(),
                refund_policy: None,
                created_at: 0,
                updated_at: 0,
            },
            tenant: Tenant {
                id: "bz_tnt_1".to_string(),
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                payout_account_id: "acct_acme".to_string(),
                details_submitted: true,
                created_at: 0,
                updated_at: 0,
            },
        }
    }

    #[test]
    fn test_line_items_total_catalog_prices() {
        let products = vec![
            product_with_tenant("p1", "One", 1000),
            product_with_tenant("p2", "Two", 2500),
        ];
        let ids = vec!["p1".to_string(), "p2".to_string()];

        let (items, total) = build_line_items(&ids, &products);
        assert_eq!(items.len(), 2);
        assert_eq!(total, 3500);
        assert_eq!(platform_fee(total, 1000), 350);
        assert_eq!(items[0].payout_account_id, "acct_acme");
    }

    #[test]
    fn test_line_items_price_duplicates_per_occurrence() {
        let products = vec![product_with_tenant("p1", "One", 1000)];
        let ids = vec!["p1".to_string(), "p1".to_string()];

        let (items, total) = build_line_items(&ids, &products);
        assert_eq!(items.len(), 2);
        assert_eq!(total, 2000);
    }

    #[test]
    fn test_platform_fee_rounds_half_up() {
        // 10% of 3500 = 350, exact
        assert_eq!(platform_fee(3500, 1000), 350);
        // 10% of 5 = 0.5 -> rounds up to 1
        assert_eq!(platform_fee(5, 1000), 1);
        // 2.5% of 999 = 24.975 -> 25
        assert_eq!(platform_fee(999, 250), 25);
        // 2.5% of 980 = 24.5 -> half rounds up
        assert_eq!(platform_fee(980, 250), 25);
        // 2.5% of 979 = 24.475 -> 24
        assert_eq!(platform_fee(979, 250), 24);
        assert_eq!(platform_fee(0, 1000), 0);
        assert_eq!(platform_fee(3500, 0), 0);
    }
}
