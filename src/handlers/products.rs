use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::{Json, Path, Query};
use crate::middleware::maybe_current_user;
use crate::models::{ProductFilter, ProductSort, ProductWithTenant};
use crate::pagination::{Paginated, PaginationQuery};

#[derive(Debug, Deserialize, Default)]
pub struct ListProductsQuery {
    /// Category slug; matches the category or any of its subcategories.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<i64>,
    #[serde(default)]
    pub max_price: Option<i64>,
    /// Restrict to one tenant's storefront.
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub sort: Option<ProductSort>,
    // Flattening PaginationQuery here trips serde_urlencoded, so the two
    // fields are repeated inline.
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Paginated<ProductWithTenant>>> {
    let filter = ProductFilter {
        category_slug: query.category.clone(),
        min_price_cents: query.min_price,
        max_price_cents: query.max_price,
        tenant_slug: query.tenant.clone(),
        sort: query.sort.unwrap_or_default(),
    };

    let pagination = PaginationQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let conn = state.db.get()?;
    let (items, total) = queries::list_products(&conn, &filter, limit, offset)?;

    Ok(Json(Paginated::new(items, total, limit, offset)))
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: ProductWithTenant,
    /// Whether the requesting buyer already owns this product. Always
    /// false for anonymous requests.
    pub is_purchased: bool,
}

/// Single product with tenant expanded. A valid bearer session, when
/// present, personalizes `is_purchased` from the order ledger; anonymous
/// requests are fine.
pub async fn get_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>> {
    let conn = state.db.get()?;
    let product =
        queries::get_product_with_tenant(&conn, &id).or_not_found(msg::PRODUCT_NOT_FOUND)?;

    let is_purchased = match maybe_current_user(&state, &headers)? {
        Some(user) => queries::user_owns_product(&conn, &user.id, &product.product.id)?,
        None => false,
    };

    Ok(Json(ProductResponse {
        product,
        is_purchased,
    }))
}
