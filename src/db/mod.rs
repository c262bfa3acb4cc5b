mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::{RazorpayConfig, StripeConfig};
use crate::payments::PaymentProvider;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and payment configuration.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Storefront base URL for success/cancel redirects
    pub app_url: String,
    /// Platform fee in basis points (1000 = 10%)
    pub platform_fee_bps: i64,
    /// Which provider checkout sessions are created with
    pub payment_provider: PaymentProvider,
    pub stripe: Option<StripeConfig>,
    pub razorpay: Option<RazorpayConfig>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
