//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! This module provides a `FromRow` trait that models can implement to
//! define how they are constructed from database rows, plus helper
//! functions for common query patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
///
/// Implementing this trait allows using the `query_one` and `query_all`
/// helper functions, reducing repetitive row mapping closures.
pub trait FromRow: Sized {
    /// Construct an instance from a database row.
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, created_at, updated_at";

pub const TENANT_COLS: &str =
    "id, name, slug, payout_account_id, details_submitted, created_at, updated_at";

pub const CATEGORY_COLS: &str = "id, name, slug, color, parent_id, created_at";

/// Product columns joined with the owning tenant (aliases `p` / `t`).
pub const PRODUCT_WITH_TENANT_COLS: &str = "p.id, p.tenant_id, p.category_id, p.name, p.description, p.price_cents, p.currency, p.refund_policy, p.created_at, p.updated_at, t.id, t.name, t.slug, t.payout_account_id, t.details_submitted, t.created_at, t.updated_at";

pub const CHECKOUT_SESSION_COLS: &str = "id, user_id, tenant_slug, product_ids, amount_cents, fee_cents, currency, provider, provider_session_id, completed, created_at";

pub const ORDER_COLS: &str =
    "id, user_id, product_id, name, payment_session_id, payout_account_id, created_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl FromRow for Tenant {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Tenant {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            payout_account_id: row.get(3)?,
            details_submitted: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for Category {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            color: row.get(3)?,
            parent_id: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for ProductWithTenant {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ProductWithTenant {
            product: Product {
                id: row.get(0)?,
                tenant_id: row.get(1)?,
                category_id: row.get(2)?,
                name: row.get(3)?,
                description: row.get(4)?,
                price_cents: row.get(5)?,
                currency: row.get(6)?,
                refund_policy: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
            },
            tenant: Tenant {
                id: row.get(10)?,
                name: row.get(11)?,
                slug: row.get(12)?,
                payout_account_id: row.get(13)?,
                details_submitted: row.get(14)?,
                created_at: row.get(15)?,
                updated_at: row.get(16)?,
            },
        })
    }
}

impl FromRow for CheckoutSession {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // product_ids is stored as a JSON array of strings
        let product_ids_json: String = row.get(3)?;
        let product_ids: Vec<String> =
            serde_json::from_str(&product_ids_json).map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    3,
                    "product_ids".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;
        Ok(CheckoutSession {
            id: row.get(0)?,
            user_id: row.get(1)?,
            tenant_slug: row.get(2)?,
            product_ids,
            amount_cents: row.get(4)?,
            fee_cents: row.get(5)?,
            currency: row.get(6)?,
            provider: row.get(7)?,
            provider_session_id: row.get(8)?,
            completed: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl FromRow for Order {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Order {
            id: row.get(0)?,
            user_id: row.get(1)?,
            product_id: row.get(2)?,
            name: row.get(3)?,
            payment_session_id: row.get(4)?,
            payout_account_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
