use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::Tenant;

/// A digital product listed by a tenant.
///
/// `price_cents` is the single source of truth for pricing: checkout and
/// webhook reconciliation both re-read it and never trust client or
/// provider-supplied amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Current price in minor currency units.
    pub price_cents: i64,
    /// Lowercase ISO currency code (e.g. "usd", "inr").
    pub currency: String,
    /// Freeform policy label shown on the storefront (e.g. "30-day").
    pub refund_policy: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A product with its owning tenant expanded, the shape checkout and the
/// catalog endpoints work with (payout routing needs the tenant).
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithTenant {
    #[serde(flatten)]
    pub product: Product,
    pub tenant: Tenant,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub refund_policy: Option<String>,
}

impl CreateProduct {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        if self.price_cents < 0 {
            return Err(AppError::BadRequest("Price cannot be negative".into()));
        }
        Ok(())
    }
}

/// Sort orders for the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    /// The ORDER BY clause for this sort. Values are fixed strings, never
    /// user input.
    pub fn order_by(&self) -> &'static str {
        match self {
            ProductSort::Newest => "p.created_at DESC",
            ProductSort::Oldest => "p.created_at ASC",
            ProductSort::PriceAsc => "p.price_cents ASC, p.created_at DESC",
            ProductSort::PriceDesc => "p.price_cents DESC, p.created_at DESC",
        }
    }
}

/// Filters for the product listing, all optional.
#[derive(Debug, Default)]
pub struct ProductFilter {
    /// Category slug; matches the category itself or any of its
    /// subcategories.
    pub category_slug: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub tenant_slug: Option<String>,
    pub sort: ProductSort,
}
