//! Query layer over the document store.
//!
//! Catalog reads (tenants, categories, products), the session table, the
//! checkout-session claim used by the webhook reconciler, and the
//! append-only order ledger all live here. Handlers never touch SQL
//! directly.

use chrono::Utc;
use rusqlite::{params, Connection, ToSql};
use uuid::Uuid;

use crate::error::Result;
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    query_all, query_one, CATEGORY_COLS, CHECKOUT_SESSION_COLS, ORDER_COLS,
    PRODUCT_WITH_TENANT_COLS, TENANT_COLS, USER_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Comma-joined "?" placeholders for an IN clause of `n` values.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ============ Users & Sessions ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = EntityType::User.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO users (id, email, name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, &input.email, &input.name, now, now],
    )?;

    Ok(User {
        id,
        email: input.email.clone(),
        name: input.name.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

/// Issue an opaque bearer token for a user. Session issuance proper lives
/// outside this service; this exists for seeding and tests.
pub fn create_session(conn: &Connection, user_id: &str, ttl_secs: Option<i64>) -> Result<String> {
    // Two UUIDs worth of entropy behind the brand prefix.
    let token = format!(
        "{}_{}{}",
        EntityType::SessionToken.prefix(),
        Uuid::new_v4().as_simple(),
        Uuid::new_v4().as_simple()
    );
    let now = now();
    let expires_at = ttl_secs.map(|ttl| now + ttl);

    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![&token, user_id, now, expires_at],
    )?;

    Ok(token)
}

/// Resolve a bearer token to its user, honoring expiry.
pub fn get_user_by_session_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM users u
             JOIN sessions s ON s.user_id = u.id
             WHERE s.token = ?1
               AND (s.expires_at IS NULL OR s.expires_at > ?2)",
            "u.id, u.email, u.name, u.created_at, u.updated_at"
        ),
        &[&token, &now()],
    )
}

// ============ Tenants ============

pub fn create_tenant(conn: &Connection, input: &CreateTenant) -> Result<Tenant> {
    let id = EntityType::Tenant.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO tenants (id, name, slug, payout_account_id, details_submitted, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            &input.name,
            &input.slug,
            &input.payout_account_id,
            input.details_submitted,
            now,
            now
        ],
    )?;

    Ok(Tenant {
        id,
        name: input.name.clone(),
        slug: input.slug.clone(),
        payout_account_id: input.payout_account_id.clone(),
        details_submitted: input.details_submitted,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_tenant_by_slug(conn: &Connection, slug: &str) -> Result<Option<Tenant>> {
    query_one(
        conn,
        &format!("SELECT {} FROM tenants WHERE slug = ?1", TENANT_COLS),
        &[&slug],
    )
}

pub fn get_tenant_by_id(conn: &Connection, id: &str) -> Result<Option<Tenant>> {
    query_one(
        conn,
        &format!("SELECT {} FROM tenants WHERE id = ?1", TENANT_COLS),
        &[&id],
    )
}

/// Flip the onboarding flag once the provider reports a settlement
/// destination.
pub fn set_tenant_details_submitted(
    conn: &Connection,
    tenant_id: &str,
    submitted: bool,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE tenants SET details_submitted = ?1, updated_at = ?2 WHERE id = ?3",
        params![submitted, now(), tenant_id],
    )?;
    Ok(affected > 0)
}

// ============ Categories ============

pub fn create_category(conn: &Connection, input: &CreateCategory) -> Result<Category> {
    let id = EntityType::Category.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO categories (id, name, slug, color, parent_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![&id, &input.name, &input.slug, &input.color, &input.parent_id, now],
    )?;

    Ok(Category {
        id,
        name: input.name.clone(),
        slug: input.slug.clone(),
        color: input.color.clone(),
        parent_id: input.parent_id.clone(),
        created_at: now,
    })
}

pub fn get_category_by_slug(conn: &Connection, slug: &str) -> Result<Option<Category>> {
    query_one(
        conn,
        &format!("SELECT {} FROM categories WHERE slug = ?1", CATEGORY_COLS),
        &[&slug],
    )
}

/// All root categories with their subcategories nested, ordered by name.
pub fn list_category_tree(conn: &Connection) -> Result<Vec<CategoryTree>> {
    let all: Vec<Category> = query_all(
        conn,
        &format!("SELECT {} FROM categories ORDER BY name ASC", CATEGORY_COLS),
        &[],
    )?;

    let (roots, children): (Vec<Category>, Vec<Category>) =
        all.into_iter().partition(|c| c.parent_id.is_none());

    Ok(roots
        .into_iter()
        .map(|root| {
            let subcategories = children
                .iter()
                .filter(|c| c.parent_id.as_deref() == Some(root.id.as_str()))
                .cloned()
                .collect();
            CategoryTree {
                category: root,
                subcategories,
            }
        })
        .collect())
}

// ============ Products ============

pub fn create_product(
    conn: &Connection,
    tenant_id: &str,
    input: &CreateProduct,
) -> Result<Product> {
    let id = EntityType::Product.gen_id();
    let now = now();
    let currency = input.currency.clone().unwrap_or_else(|| "usd".to_string());

    conn.execute(
        "INSERT INTO products (id, tenant_id, category_id, name, description, price_cents, currency, refund_policy, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &id,
            tenant_id,
            &input.category_id,
            &input.name,
            &input.description,
            input.price_cents,
            &currency,
            &input.refund_policy,
            now,
            now
        ],
    )?;

    Ok(Product {
        id,
        tenant_id: tenant_id.to_string(),
        category_id: input.category_id.clone(),
        name: input.name.clone(),
        description: input.description.clone(),
        price_cents: input.price_cents,
        currency,
        refund_policy: input.refund_policy.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn set_product_price(conn: &Connection, product_id: &str, price_cents: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE products SET price_cents = ?1, updated_at = ?2 WHERE id = ?3",
        params![price_cents, now(), product_id],
    )?;
    Ok(affected > 0)
}

pub fn get_product_with_tenant(conn: &Connection, id: &str) -> Result<Option<ProductWithTenant>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM products p JOIN tenants t ON p.tenant_id = t.id WHERE p.id = ?1",
            PRODUCT_WITH_TENANT_COLS
        ),
        &[&id],
    )
}

/// Fetch products by id with tenants expanded, in no particular order.
/// Ids the catalog no longer has are simply absent from the result; the
/// caller diffs to find them (cart pruning).
pub fn get_products_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<ProductWithTenant>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM products p JOIN tenants t ON p.tenant_id = t.id WHERE p.id IN ({})",
        PRODUCT_WITH_TENANT_COLS,
        placeholders(ids.len())
    );
    let params: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
    query_all(conn, &sql, &params)
}

/// Fetch products by id constrained to one tenant's slug, tenants
/// expanded.
///
/// The slug constraint is what makes the count check in checkout and the
/// webhook reconciler catch cross-tenant injection: an id that exists but
/// belongs to another tenant is simply not returned.
pub fn get_products_for_tenant(
    conn: &Connection,
    ids: &[String],
    tenant_slug: &str,
) -> Result<Vec<ProductWithTenant>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM products p JOIN tenants t ON p.tenant_id = t.id
         WHERE p.id IN ({}) AND t.slug = ?",
        PRODUCT_WITH_TENANT_COLS,
        placeholders(ids.len())
    );
    let mut params: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
    params.push(&tenant_slug);
    query_all(conn, &sql, &params)
}

/// Paginated product listing with optional filters. Returns the page and
/// the total match count.
pub fn list_products(
    conn: &Connection,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<ProductWithTenant>, i64)> {
    let mut conditions: Vec<&'static str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(ref slug) = filter.category_slug {
        // The category itself or any of its subcategories.
        conditions.push(
            "p.category_id IN (
                SELECT id FROM categories WHERE slug = ?
                UNION
                SELECT id FROM categories
                 WHERE parent_id IN (SELECT id FROM categories WHERE slug = ?)
            )",
        );
        params.push(Box::new(slug.clone()));
        params.push(Box::new(slug.clone()));
    }
    if let Some(min) = filter.min_price_cents {
        conditions.push("p.price_cents >= ?");
        params.push(Box::new(min));
    }
    if let Some(max) = filter.max_price_cents {
        conditions.push("p.price_cents <= ?");
        params.push(Box::new(max));
    }
    if let Some(ref tenant) = filter.tenant_slug {
        conditions.push("t.slug = ?");
        params.push(Box::new(tenant.clone()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let base = format!(
        "FROM products p JOIN tenants t ON p.tenant_id = t.id{}",
        where_clause
    );
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {}", base),
        param_refs.as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {} {} ORDER BY {} LIMIT {} OFFSET {}",
        PRODUCT_WITH_TENANT_COLS,
        base,
        filter.sort.order_by(),
        limit,
        offset
    );
    let items = query_all(conn, &sql, &param_refs)?;

    Ok((items, total))
}

// ============ Checkout Sessions ============

pub fn create_checkout_session(
    conn: &Connection,
    input: &CreateCheckoutSession,
) -> Result<CheckoutSession> {
    let id = EntityType::CheckoutSession.gen_id();
    let now = now();
    let product_ids_json = serde_json::to_string(&input.product_ids)?;

    conn.execute(
        "INSERT INTO checkout_sessions (id, user_id, tenant_slug, product_ids, amount_cents, fee_cents, currency, provider, completed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
        params![
            &id,
            &input.user_id,
            &input.tenant_slug,
            &product_ids_json,
            input.amount_cents,
            input.fee_cents,
            &input.currency,
            &input.provider,
            now
        ],
    )?;

    Ok(CheckoutSession {
        id,
        user_id: input.user_id.clone(),
        tenant_slug: input.tenant_slug.clone(),
        product_ids: input.product_ids.clone(),
        amount_cents: input.amount_cents,
        fee_cents: input.fee_cents,
        currency: input.currency.clone(),
        provider: input.provider.clone(),
        provider_session_id: None,
        completed: false,
        created_at: now,
    })
}

pub fn get_checkout_session(conn: &Connection, id: &str) -> Result<Option<CheckoutSession>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM checkout_sessions WHERE id = ?1",
            CHECKOUT_SESSION_COLS
        ),
        &[&id],
    )
}

/// Record the provider's session/order id once the provider call
/// succeeds.
pub fn set_checkout_session_provider_id(
    conn: &Connection,
    id: &str,
    provider_session_id: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE checkout_sessions SET provider_session_id = ?1 WHERE id = ?2",
        params![provider_session_id, id],
    )?;
    Ok(())
}

/// Atomically mark a checkout session as completed, returning whether the
/// claim was successful.
///
/// Compare-and-swap on `completed` so concurrent webhook deliveries for
/// the same payment cannot both proceed to order creation.
///
/// Returns:
/// - `Ok(true)` if this call claimed the session (was not completed)
/// - `Ok(false)` if another delivery already claimed it
pub fn try_claim_checkout_session(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE checkout_sessions SET completed = 1 WHERE id = ?1 AND completed = 0",
        params![id],
    )?;
    Ok(affected > 0)
}

/// Purge abandoned checkout sessions beyond the retention period.
/// Completed sessions are kept - they document the priced purchase behind
/// each order. Returns the number of deleted records.
pub fn purge_old_checkout_sessions(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM checkout_sessions WHERE completed = 0 AND created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

// ============ Order Ledger ============

/// Insert an order unless one already exists for this
/// (payment_session_id, product_id) pair.
///
/// `INSERT OR IGNORE` against the unique index makes this safe under
/// webhook redelivery and under concurrent deliveries racing each other:
/// at most one insert wins, the loser observes a benign no-op.
///
/// Returns whether a row was actually created.
pub fn insert_order_if_absent(conn: &Connection, input: &CreateOrder) -> Result<bool> {
    let id = EntityType::Order.gen_id();
    let affected = conn.execute(
        "INSERT OR IGNORE INTO orders (id, user_id, product_id, name, payment_session_id, payout_account_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            &input.user_id,
            &input.product_id,
            &input.name,
            &input.payment_session_id,
            &input.payout_account_id,
            now()
        ],
    )?;
    Ok(affected > 0)
}

pub fn count_orders_for_session(conn: &Connection, payment_session_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE payment_session_id = ?1",
        params![payment_session_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get_order_for_user_product(
    conn: &Connection,
    user_id: &str,
    product_id: &str,
) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM orders WHERE user_id = ?1 AND product_id = ?2 LIMIT 1",
            ORDER_COLS
        ),
        &[&user_id, &product_id],
    )
}

pub fn user_owns_product(conn: &Connection, user_id: &str, product_id: &str) -> Result<bool> {
    Ok(get_order_for_user_product(conn, user_id, product_id)?.is_some())
}

/// The buyer's library: distinct owned products with tenants expanded,
/// newest first. Orders whose product has since been deleted from the
/// catalog are silently dropped (the order row itself survives).
pub fn list_library_products(
    conn: &Connection,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<(Vec<ProductWithTenant>, i64)> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products p
         WHERE p.id IN (SELECT DISTINCT product_id FROM orders WHERE user_id = ?1)",
        params![user_id],
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {} FROM products p JOIN tenants t ON p.tenant_id = t.id
         WHERE p.id IN (SELECT DISTINCT product_id FROM orders WHERE user_id = ?)
         ORDER BY p.created_at DESC LIMIT {} OFFSET {}",
        PRODUCT_WITH_TENANT_COLS, limit, offset
    );
    let items = query_all(conn, &sql, &[&user_id])?;

    Ok((items, total))
}
