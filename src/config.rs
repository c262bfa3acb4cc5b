use std::env;

use crate::payments::PaymentProvider;

/// Stripe API credentials, from the environment.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

/// Razorpay API credentials, from the environment.
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Public base URL of this service (webhook endpoints live here).
    pub base_url: String,
    /// Storefront base URL, used to build success/cancel redirect URLs.
    pub app_url: String,
    /// Platform fee in basis points (PLATFORM_FEE_PERCENT=10 -> 1000).
    pub platform_fee_bps: i64,
    pub payment_provider: PaymentProvider,
    pub stripe: Option<StripeConfig>,
    pub razorpay: Option<RazorpayConfig>,
    /// Abandoned checkout sessions older than this are purged at startup.
    pub checkout_session_retention_days: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("BAZAAR_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let app_url = env::var("APP_URL").unwrap_or_else(|_| base_url.clone());

        // Fee percent is accepted as a decimal (e.g. "10" or "2.5") and held
        // as integer basis points so fee math stays in integer arithmetic.
        let fee_percent: f64 = env::var("PLATFORM_FEE_PERCENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10.0);
        let platform_fee_bps = (fee_percent * 100.0).round() as i64;

        let payment_provider = env::var("PAYMENT_PROVIDER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(PaymentProvider::Stripe);

        let stripe = match (env::var("STRIPE_SECRET_KEY"), env::var("STRIPE_WEBHOOK_SECRET")) {
            (Ok(secret_key), Ok(webhook_secret)) => Some(StripeConfig {
                secret_key,
                webhook_secret,
            }),
            _ => None,
        };

        let razorpay = match (
            env::var("RAZORPAY_KEY_ID"),
            env::var("RAZORPAY_KEY_SECRET"),
            env::var("RAZORPAY_WEBHOOK_SECRET"),
        ) {
            (Ok(key_id), Ok(key_secret), Ok(webhook_secret)) => Some(RazorpayConfig {
                key_id,
                key_secret,
                webhook_secret,
            }),
            _ => None,
        };

        let checkout_session_retention_days = env::var("CHECKOUT_SESSION_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "bazaar.db".to_string()),
            base_url,
            app_url,
            platform_fee_bps,
            payment_provider,
            stripe,
            razorpay,
            checkout_session_retention_days,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
