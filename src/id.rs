//! Prefixed ID generation for bazaar entities.
//!
//! All IDs use a `bz_` brand prefix to guarantee collision avoidance with
//! payment provider IDs (Stripe's `cs_`, `pi_`, `acct_`, Razorpay's
//! `order_`, `pay_`, etc.).
//!
//! Format: `bz_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &[
    "bz_usr_",
    "bz_tnt_",
    "bz_cat_",
    "bz_prod_",
    "bz_ord_",
    "bz_cs_",
    "bz_tok_",
];

/// Validate that a string is a valid bazaar prefixed ID.
///
/// This is a cheap check to reject garbage before hitting the database.
/// Validates format: `bz_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];

    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in bazaar.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    Tenant,
    Category,
    Product,
    Order,
    CheckoutSession,
    SessionToken,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "bz_usr",
            Self::Tenant => "bz_tnt",
            Self::Category => "bz_cat",
            Self::Product => "bz_prod",
            Self::Order => "bz_ord",
            Self::CheckoutSession => "bz_cs",
            Self::SessionToken => "bz_tok",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = EntityType::Order.gen_id();
        assert!(id.starts_with("bz_ord_"));
        // bz_ord_ (7 chars) + 32 hex chars = 39 chars total
        assert_eq!(id.len(), 39);
    }

    #[test]
    fn test_all_prefixes_unique() {
        let prefixes: Vec<&str> = vec![
            EntityType::User.prefix(),
            EntityType::Tenant.prefix(),
            EntityType::Category.prefix(),
            EntityType::Product.prefix(),
            EntityType::Order.prefix(),
            EntityType::CheckoutSession.prefix(),
            EntityType::SessionToken.prefix(),
        ];

        let mut seen = std::collections::HashSet::new();
        for prefix in prefixes {
            assert!(seen.insert(prefix), "Duplicate prefix found: {}", prefix);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let id1 = EntityType::Product.gen_id();
        let id2 = EntityType::Product.gen_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_is_valid_prefixed_id() {
        assert!(is_valid_prefixed_id("bz_usr_a1b2c3d4e5f6789012345678901234ab"));
        assert!(is_valid_prefixed_id("bz_prod_a1b2c3d4e5f6789012345678901234ab"));
        assert!(is_valid_prefixed_id(&EntityType::Tenant.gen_id()));
        assert!(is_valid_prefixed_id(&EntityType::CheckoutSession.gen_id()));

        assert!(!is_valid_prefixed_id(""));
        assert!(!is_valid_prefixed_id("a1b2c3d4-e5f6-7890-1234-567890123456"));
        assert!(!is_valid_prefixed_id("bz_unknown_a1b2c3d4e5f6789012345678901234ab"));
        assert!(!is_valid_prefixed_id("bz_usr_a1b2c3d4"));
        assert!(!is_valid_prefixed_id("bz_usr_a1b2c3d4e5f6789012345678901234gg"));
        assert!(!is_valid_prefixed_id("prod_a1b2c3d4e5f6789012345678901234ab"));
    }
}
