use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::{Json, Path};

/// Public tenant card - payout details stay server-side.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
}

pub async fn get_tenant(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TenantResponse>> {
    let conn = state.db.get()?;
    let tenant = queries::get_tenant_by_slug(&conn, &slug).or_not_found(msg::TENANT_NOT_FOUND)?;

    Ok(Json(TenantResponse {
        id: tenant.id,
        name: tenant.name,
        slug: tenant.slug,
    }))
}
