use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A shared catalog category. Two levels deep: roots and subcategories
/// (a subcategory has `parent_id` set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    /// Display color for the storefront navigation.
    pub color: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: i64,
}

/// A root category with its subcategories nested, as returned by
/// `GET /categories`.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTree {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl CreateCategory {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        if self.slug.trim().is_empty() {
            return Err(AppError::BadRequest("Slug cannot be empty".into()));
        }
        Ok(())
    }
}
