mod categories;
mod checkout;
mod library;
mod products;
mod tenants;
pub mod webhooks;

pub use categories::*;
pub use checkout::*;
pub use library::*;
pub use products::*;
pub use tenants::*;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;
use crate::middleware::session_auth;
use crate::rate_limit;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The full application router without rate limiting (tests use this).
pub fn router(state: AppState) -> Router {
    assemble(state, false)
}

/// The full application router with per-IP rate limits, for `main`.
/// Requires serving with connect info so the limiter can key on peer IP.
pub fn router_with_rate_limits(state: AppState) -> Router {
    assemble(state, true)
}

fn assemble(state: AppState, rate_limited: bool) -> Router {
    let mut health_routes = Router::new().route("/health", get(health));

    let mut catalog = Router::new()
        .route("/categories", get(list_categories))
        .route("/tenants/{slug}", get(get_tenant))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/checkout/products", get(get_checkout_products));

    let mut library_routes = Router::new()
        .route("/library", get(list_library))
        .route("/library/{product_id}", get(get_library_product))
        .route_layer(from_fn_with_state(state.clone(), session_auth));

    // Checkout fans out to provider APIs, so it gets the strict tier.
    let mut purchase_routes = Router::new()
        .route("/checkout/purchase", post(purchase))
        .route_layer(from_fn_with_state(state.clone(), session_auth));

    if rate_limited {
        health_routes = rate_limit::relaxed(health_routes);
        catalog = rate_limit::standard(catalog);
        library_routes = rate_limit::standard(library_routes);
        purchase_routes = rate_limit::strict(purchase_routes);
    }

    // Webhooks are deliberately unlimited - see rate_limit.rs.
    Router::new()
        .merge(health_routes)
        .merge(catalog)
        .merge(library_routes)
        .merge(purchase_routes)
        .merge(webhooks::router())
        .with_state(state)
}
