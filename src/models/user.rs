use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Basic email format validation.
///
/// Intentionally permissive - just a sanity check, not RFC 5322.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest("Email cannot be empty".into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() || !parts[1].contains('.') {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    Ok(())
}

/// A buyer. Session issuance lives outside this service; the `sessions`
/// table maps opaque bearer tokens to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email_format("buyer@example.com").is_ok());
        assert!(validate_email_format("a@b.co").is_ok());
        assert!(validate_email_format("").is_err());
        assert!(validate_email_format("no-at-sign").is_err());
        assert!(validate_email_format("two@@example.com").is_err());
        assert!(validate_email_format("nodot@domain").is_err());
    }
}
