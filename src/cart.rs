//! Tenant-scoped cart state.
//!
//! The cart is owned entirely by the buyer's client and persisted there
//! across sessions; this type is the canonical representation plus the
//! operations the storefront needs. Each tenant gets its own product set so
//! a single cart never mixes sellers.
//!
//! Deliberately NOT validated against the catalog — carts can outlive
//! product availability, so validation is deferred to checkout time
//! (`GET /checkout/products` reports `missing_ids` for pruning).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Mapping from tenant slug to the set of product ids the buyer intends to
/// buy from that tenant. A product id appears at most once per tenant set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    carts: BTreeMap<String, BTreeSet<String>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent set-insert.
    pub fn add_product(&mut self, tenant_slug: &str, product_id: &str) {
        self.carts
            .entry(tenant_slug.to_string())
            .or_default()
            .insert(product_id.to_string());
    }

    /// Idempotent set-remove. Drops the tenant entry once its set is empty
    /// so `tenant_slugs` only reports tenants with something in the cart.
    pub fn remove_product(&mut self, tenant_slug: &str, product_id: &str) {
        if let Some(set) = self.carts.get_mut(tenant_slug) {
            set.remove(product_id);
            if set.is_empty() {
                self.carts.remove(tenant_slug);
            }
        }
    }

    /// Adds the product if absent, removes it if present.
    pub fn toggle_product(&mut self, tenant_slug: &str, product_id: &str) {
        if self.is_in_cart(tenant_slug, product_id) {
            self.remove_product(tenant_slug, product_id);
        } else {
            self.add_product(tenant_slug, product_id);
        }
    }

    pub fn is_in_cart(&self, tenant_slug: &str, product_id: &str) -> bool {
        self.carts
            .get(tenant_slug)
            .map(|set| set.contains(product_id))
            .unwrap_or(false)
    }

    /// Product ids in the tenant's cart, ready to feed into a
    /// `CheckoutRequest`.
    pub fn product_ids(&self, tenant_slug: &str) -> Vec<String> {
        self.carts
            .get(tenant_slug)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn total_items(&self, tenant_slug: &str) -> usize {
        self.carts.get(tenant_slug).map(|set| set.len()).unwrap_or(0)
    }

    /// Tenants that currently have at least one product in the cart.
    pub fn tenant_slugs(&self) -> Vec<&str> {
        self.carts.keys().map(|s| s.as_str()).collect()
    }

    pub fn clear_cart(&mut self, tenant_slug: &str) {
        self.carts.remove(tenant_slug);
    }

    pub fn clear_all_carts(&mut self) {
        self.carts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut cart = CartState::new();
        cart.add_product("acme", "p1");
        cart.add_product("acme", "p1");
        cart.add_product("acme", "p2");

        assert_eq!(cart.total_items("acme"), 2);
        assert!(cart.is_in_cart("acme", "p1"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = CartState::new();
        cart.add_product("acme", "p1");
        cart.remove_product("acme", "p1");
        cart.remove_product("acme", "p1");

        assert!(!cart.is_in_cart("acme", "p1"));
        assert_eq!(cart.total_items("acme"), 0);
    }

    #[test]
    fn test_carts_are_tenant_scoped() {
        let mut cart = CartState::new();
        cart.add_product("acme", "p1");
        cart.add_product("globex", "p1");
        cart.add_product("globex", "p2");

        assert_eq!(cart.total_items("acme"), 1);
        assert_eq!(cart.total_items("globex"), 2);

        cart.clear_cart("globex");
        assert_eq!(cart.total_items("globex"), 0);
        assert!(cart.is_in_cart("acme", "p1"));
    }

    #[test]
    fn test_toggle() {
        let mut cart = CartState::new();
        cart.toggle_product("acme", "p1");
        assert!(cart.is_in_cart("acme", "p1"));
        cart.toggle_product("acme", "p1");
        assert!(!cart.is_in_cart("acme", "p1"));
    }

    #[test]
    fn test_clear_all_carts() {
        let mut cart = CartState::new();
        cart.add_product("acme", "p1");
        cart.add_product("globex", "p2");
        cart.clear_all_carts();

        assert_eq!(cart.tenant_slugs().len(), 0);
        assert_eq!(cart.total_items("acme"), 0);
    }

    #[test]
    fn test_empty_tenant_entries_are_dropped() {
        let mut cart = CartState::new();
        cart.add_product("acme", "p1");
        cart.remove_product("acme", "p1");

        assert!(cart.tenant_slugs().is_empty());
    }

    #[test]
    fn test_survives_serde_round_trip() {
        let mut cart = CartState::new();
        cart.add_product("acme", "p1");
        cart.add_product("acme", "p2");
        cart.add_product("globex", "p3");

        let json = serde_json::to_string(&cart).unwrap();
        let restored: CartState = serde_json::from_str(&json).unwrap();
        assert_eq!(cart, restored);
    }
}
