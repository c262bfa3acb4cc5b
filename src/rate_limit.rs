//! Rate limiting for public endpoints.
//!
//! Limits are applied per client IP. Webhook endpoints are NOT rate
//! limited - throttling the provider's delivery system only causes retry
//! storms.
//!
//! Tiers:
//! - Strict: /checkout/purchase - external provider API calls
//! - Standard: catalog and library reads
//! - Relaxed: /health
//!
//! Configure via environment variables:
//! - RATE_LIMIT_STRICT_RPM (default: 10)
//! - RATE_LIMIT_STANDARD_RPM (default: 60)
//! - RATE_LIMIT_RELAXED_RPM (default: 120)

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

fn rpm_from_env(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|rpm| *rpm > 0)
        .unwrap_or(default)
}

/// Wrap a router with a per-IP rate limit of `requests_per_minute`.
fn limit<S>(router: Router<S>, requests_per_minute: u32) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let period_secs = (60 / requests_per_minute as u64).max(1);
    let config = GovernorConfigBuilder::default()
        .period(Duration::from_secs(period_secs))
        .burst_size(requests_per_minute)
        .finish()
        .expect("Failed to build rate limiter config");

    router.layer(GovernorLayer::new(Arc::new(config)))
}

/// Strict tier: endpoints that make external provider API calls.
pub fn strict<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    limit(router, rpm_from_env("RATE_LIMIT_STRICT_RPM", 10))
}

/// Standard tier: catalog and library reads.
pub fn standard<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    limit(router, rpm_from_env("RATE_LIMIT_STANDARD_RPM", 60))
}

/// Relaxed tier: lightweight endpoints like health checks.
pub fn relaxed<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    limit(router, rpm_from_env("RATE_LIMIT_RELAXED_RPM", 120))
}
