//! Newtype IDs for type-safe entity references.
//!
//! Document-store identifiers are opaque strings. Use the `define_id!` macro
//! to create wrappers that prevent accidentally mixing IDs from different
//! entity types.

use serde_json::Value;

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use nuel_store_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("abc");
/// let order_id = OrderId::new("abc");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(UserId);
define_id!(PurchaseId);
define_id!(OrderId);

impl ProductId {
    /// Normalise a raw JSON identifier.
    ///
    /// The static product list uses numbers and the document store uses
    /// strings; both map onto the same canonical string form. Returns `None`
    /// for anything that is not a non-empty string or an integer.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_owned())),
            Value::Number(n) => n
                .as_i64()
                .map(|i| i.to_string())
                .or_else(|| n.as_u64().map(|u| u.to_string()))
                .map(Self),
            _ => None,
        }
    }
}

impl OrderId {
    /// Generate a fresh random order ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_id_from_number_and_string_agree() {
        assert_eq!(ProductId::from_json(&json!(1)), Some(ProductId::new("1")));
        assert_eq!(ProductId::from_json(&json!("1")), Some(ProductId::new("1")));
    }

    #[test]
    fn test_product_id_rejects_other_shapes() {
        assert_eq!(ProductId::from_json(&json!("  ")), None);
        assert_eq!(ProductId::from_json(&json!(1.5)), None);
        assert_eq!(ProductId::from_json(&json!(null)), None);
        assert_eq!(ProductId::from_json(&json!({"id": 1})), None);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = UserId::new("uid-42");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"uid-42\""));
    }

    #[test]
    fn test_generated_order_ids_are_unique() {
        assert_ne!(OrderId::generate(), OrderId::generate());
    }
}
