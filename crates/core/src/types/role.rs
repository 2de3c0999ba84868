//! User roles stored on the per-user document.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role recorded in the `users/{uid}` document.
///
/// Unknown role strings are treated as [`Role::User`] by [`Role::from_field`]
/// so a malformed document never grants admin access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer.
    #[default]
    User,
    /// Catalog administrator.
    Admin,
}

impl Role {
    /// Field name of the role on user documents.
    pub const FIELD: &'static str = "role";

    /// Role string as stored in documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Read the role from an optional document field, defaulting to `User`.
    #[must_use]
    pub fn from_field(value: Option<&serde_json::Value>) -> Self {
        value
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_field() {
        assert_eq!(Role::from_field(Some(&json!("admin"))), Role::Admin);
        assert_eq!(Role::from_field(Some(&json!("user"))), Role::User);
        assert_eq!(Role::from_field(Some(&json!("superuser"))), Role::User);
        assert_eq!(Role::from_field(Some(&json!(true))), Role::User);
        assert_eq!(Role::from_field(None), Role::User);
    }
}
