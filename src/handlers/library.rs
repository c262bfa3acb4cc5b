use axum::extract::State;
use axum::Extension;

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::{Json, Path, Query};
use crate::middleware::CurrentUser;
use crate::models::ProductWithTenant;
use crate::pagination::{Paginated, PaginationQuery};

/// The buyer's library: products they own, per the order ledger.
pub async fn list_library(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<ProductWithTenant>>> {
    let limit = pagination.limit();
    let offset = pagination.offset();

    let conn = state.db.get()?;
    let (items, total) = queries::list_library_products(&conn, &user.id, limit, offset)?;

    Ok(Json(Paginated::new(items, total, limit, offset)))
}

/// A single owned product. Ownership is checked against the order ledger
/// before the product is fetched, so a valid product id the buyer never
/// bought is a 404, not a leak.
pub async fn get_library_product(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductWithTenant>> {
    let conn = state.db.get()?;

    queries::get_order_for_user_product(&conn, &user.id, &product_id)
        .or_not_found(msg::ORDER_NOT_FOUND)?;

    let product = queries::get_product_with_tenant(&conn, &product_id)
        .or_not_found(msg::PRODUCT_NOT_FOUND)?;

    Ok(Json(product))
}
