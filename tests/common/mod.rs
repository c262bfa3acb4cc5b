//! Test utilities and fixtures for bazaar integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::Value;
use tower::ServiceExt;

pub use bazaar::config::{RazorpayConfig, StripeConfig};
pub use bazaar::db::{init_db, queries, AppState};
pub use bazaar::handlers;
pub use bazaar::models::*;
pub use bazaar::payments::PaymentProvider;

pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const RAZORPAY_WEBHOOK_SECRET: &str = "rzp_test_webhook_secret";

pub fn test_stripe_config() -> StripeConfig {
    StripeConfig {
        secret_key: "sk_test_xxx".to_string(),
        webhook_secret: STRIPE_WEBHOOK_SECRET.to_string(),
    }
}

pub fn test_razorpay_config() -> RazorpayConfig {
    RazorpayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: "rzp_test_key_secret".to_string(),
        webhook_secret: RAZORPAY_WEBHOOK_SECRET.to_string(),
    }
}

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an AppState for testing with an in-memory database (pooled
/// connections share it via SQLite's shared cache).
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        app_url: "http://localhost:3000".to_string(),
        platform_fee_bps: 1000, // 10%
        payment_provider: PaymentProvider::Razorpay,
        stripe: Some(test_stripe_config()),
        razorpay: Some(test_razorpay_config()),
    }
}

/// The full application router (no rate limiting in tests).
pub fn test_app(state: AppState) -> Router {
    handlers::router(state)
}

/// Create a test buyer with a session token
pub fn create_test_user(conn: &Connection, email: &str) -> (User, String) {
    let user = queries::create_user(
        conn,
        &CreateUser {
            email: email.to_string(),
            name: format!("Test Buyer {}", email),
        },
    )
    .expect("Failed to create test user");
    let token = queries::create_session(conn, &user.id, None).expect("Failed to create session");
    (user, token)
}

/// Create a test tenant; `onboarded` controls `details_submitted`
pub fn create_test_tenant(conn: &Connection, slug: &str, onboarded: bool) -> Tenant {
    queries::create_tenant(
        conn,
        &CreateTenant {
            name: format!("Tenant {}", slug),
            slug: slug.to_string(),
            payout_account_id: format!("acct_{}", slug),
            details_submitted: onboarded,
        },
    )
    .expect("Failed to create test tenant")
}

/// Create a test category (root when `parent_id` is None)
pub fn create_test_category(conn: &Connection, slug: &str, parent_id: Option<&str>) -> Category {
    queries::create_category(
        conn,
        &CreateCategory {
            name: slug.to_string(),
            slug: slug.to_string(),
            color: None,
            parent_id: parent_id.map(|s| s.to_string()),
        },
    )
    .expect("Failed to create test category")
}

/// Create a test product under a tenant
pub fn create_test_product(
    conn: &Connection,
    tenant_id: &str,
    name: &str,
    price_cents: i64,
) -> Product {
    queries::create_product(
        conn,
        tenant_id,
        &CreateProduct {
            name: name.to_string(),
            description: None,
            price_cents,
            currency: Some("usd".to_string()),
            category_id: None,
            refund_policy: None,
        },
    )
    .expect("Failed to create test product")
}

/// Create a test order directly in the ledger
pub fn create_test_order(
    conn: &Connection,
    user_id: &str,
    product: &Product,
    payment_session_id: &str,
) {
    let created = queries::insert_order_if_absent(
        conn,
        &CreateOrder {
            user_id: user_id.to_string(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            payment_session_id: payment_session_id.to_string(),
            payout_account_id: None,
        },
    )
    .expect("Failed to create test order");
    assert!(created, "Test order already existed");
}

/// Drive the router with a GET request, optional bearer token
pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Drive the router with a JSON POST request, optional bearer token
pub async fn post_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    app.oneshot(
        builder
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Drive a webhook endpoint with a raw body and signature header
pub async fn post_webhook(
    app: Router,
    uri: &str,
    signature_header: (&str, &str),
    body: &[u8],
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(signature_header.0, signature_header.1)
            .body(Body::from(body.to_vec()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Read a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Response should be valid JSON")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

// ============ Webhook signing helpers ============

pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Full `stripe-signature` header value for a payload
pub fn stripe_signature_header(payload: &[u8], secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = compute_stripe_signature(payload, secret, &timestamp);
    format!("t={},v1={}", timestamp, signature)
}

pub fn compute_razorpay_signature(payload: &[u8], secret: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// A `payment.captured` Razorpay event body for the given purchase
pub fn razorpay_captured_event(
    payment_id: &str,
    user_id: &str,
    tenant_slug: &str,
    product_ids: &[&str],
    checkout_session_id: Option<&str>,
    amount: i64,
) -> Vec<u8> {
    let mut notes = serde_json::json!({
        "user_id": user_id,
        "tenant_slug": tenant_slug,
        "product_ids": product_ids.join(","),
    });
    if let Some(cs) = checkout_session_id {
        notes["checkout_session_id"] = Value::String(cs.to_string());
    }

    serde_json::to_vec(&serde_json::json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "amount": amount,
                    "currency": "USD",
                    "status": "captured",
                    "order_id": "order_test123",
                    "email": "buyer@example.com",
                    "notes": notes,
                }
            }
        }
    }))
    .unwrap()
}

/// A `checkout.session.completed` Stripe event body for the given purchase
pub fn stripe_completed_event(
    session_id: &str,
    user_id: &str,
    tenant_slug: &str,
    product_ids: &[&str],
    checkout_session_id: Option<&str>,
    amount_total: i64,
) -> Vec<u8> {
    let mut metadata = serde_json::json!({
        "user_id": user_id,
        "tenant_slug": tenant_slug,
        "product_ids": product_ids.join(","),
    });
    if let Some(cs) = checkout_session_id {
        metadata["checkout_session_id"] = Value::String(cs.to_string());
    }

    serde_json::to_vec(&serde_json::json!({
        "id": "evt_test123",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": "paid",
                "amount_total": amount_total,
                "currency": "usd",
                "metadata": metadata,
            }
        }
    }))
    .unwrap()
}
