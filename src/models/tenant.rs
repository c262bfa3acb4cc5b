use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// An independent seller with its own storefront slug and payout
/// destination at the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// Subdomain-style identifier, unique across the marketplace.
    pub slug: String,
    /// Connected account at the payment provider (Stripe `acct_...`,
    /// Razorpay linked account id). Payouts are routed here.
    pub payout_account_id: String,
    /// False until the tenant completes provider onboarding. Checkout is
    /// refused for tenants without a settlement destination.
    pub details_submitted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
    pub payout_account_id: String,
    #[serde(default)]
    pub details_submitted: bool,
}

impl CreateTenant {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        if self.slug.trim().is_empty() {
            return Err(AppError::BadRequest("Slug cannot be empty".into()));
        }
        // Slugs end up in URLs and provider metadata; keep them boring.
        if !self
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(AppError::BadRequest(
                "Slug may only contain lowercase letters, digits and hyphens".into(),
            ));
        }
        if self.payout_account_id.trim().is_empty() {
            return Err(AppError::BadRequest("Payout account cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CreateTenant {
        CreateTenant {
            name: "Acme Goods".to_string(),
            slug: "acme".to_string(),
            payout_account_id: "acct_123".to_string(),
            details_submitted: true,
        }
    }

    #[test]
    fn test_valid_tenant() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_slug() {
        let mut input = base();
        input.slug = "Acme Goods".to_string();
        assert!(input.validate().is_err());

        input.slug = "acme_goods".to_string();
        assert!(input.validate().is_err());

        input.slug = "acme-goods-2".to_string();
        assert!(input.validate().is_ok());
    }
}
