use axum::extract::State;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::CategoryTree;

/// Root categories with their subcategories nested, for the storefront
/// navigation.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryTree>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_category_tree(&conn)?))
}
