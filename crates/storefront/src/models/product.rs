//! Canonical product shape.
//!
//! Products come from two places: the static list bundled with the
//! storefront and the remote `products` collection. The two disagree on
//! field shapes (numeric vs string ids and prices, `image` vs `imageUrl`),
//! so both pass through [`Product::from_document`] exactly once, at the
//! catalog boundary. Everything downstream sees one shape.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use nuel_store_core::{Price, PriceError, ProductId};

use crate::baas::Document;

/// Why a raw document could not be turned into a [`Product`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductShapeError {
    #[error("product has no usable id")]
    MissingId,
    #[error("product has no name")]
    MissingName,
    #[error("product price: {0}")]
    Price(#[from] PriceError),
}

/// Where a product came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSource {
    /// Bundled static list; read-only.
    Static,
    /// Remote document store; editable by admins.
    Remote,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: String,
    pub description: String,
    pub image_url: Option<String>,
    pub source: ProductSource,
}

fn text_field(data: &Document, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

impl Product {
    /// Normalise a raw document.
    ///
    /// Remote documents pass their document id; static entries carry their
    /// own `id` field and pass `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if no id can be derived, the name is missing, or the
    /// price does not parse.
    pub fn from_document(
        id: Option<ProductId>,
        data: &Document,
        source: ProductSource,
    ) -> Result<Self, ProductShapeError> {
        let id = id
            .or_else(|| data.get("id").and_then(ProductId::from_json))
            .ok_or(ProductShapeError::MissingId)?;
        let name = text_field(data, "name").ok_or(ProductShapeError::MissingName)?;
        let price = Price::from_json(data.get("price").unwrap_or(&Value::Null))?;

        Ok(Self {
            id,
            name,
            price,
            category: text_field(data, "category").unwrap_or_default(),
            description: text_field(data, "description").unwrap_or_default(),
            image_url: text_field(data, "imageUrl").or_else(|| text_field(data, "image")),
            source,
        })
    }

    /// Whether `term` appears (case-insensitively) in the name or category.
    #[must_use]
    pub fn matches_term(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.category.to_lowercase().contains(&term)
    }
}

/// Admin-entered product fields, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
}

impl ProductDraft {
    /// Document fields for this draft, price normalised to a plain amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the price does not parse.
    pub fn to_document(&self) -> Result<Document, PriceError> {
        let price = Price::parse(&self.price)?;
        let mut doc = Document::new();
        doc.insert("name".to_owned(), json!(self.name.trim()));
        doc.insert("description".to_owned(), json!(self.description.trim()));
        doc.insert("price".to_owned(), json!(price.amount_string()));
        doc.insert("category".to_owned(), json!(self.category.trim()));
        Ok(doc)
    }
}

/// An uploaded product image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name; only its final path segment is used.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Final path segment of the file name, or `None` if nothing usable remains.
    #[must_use]
    pub fn safe_file_name(&self) -> Option<&str> {
        self.file_name
            .rsplit(['/', '\\'])
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[test]
    fn test_static_entry_with_numeric_id_and_image() {
        let raw = doc(json!({
            "id": 1,
            "name": "Smart Watch",
            "price": "$100",
            "category": "Wearables",
            "image": "/images/watch.png",
        }));
        let product = Product::from_document(None, &raw, ProductSource::Static).unwrap();
        assert_eq!(product.id, ProductId::new("1"));
        assert_eq!(product.price, Price::from_cents(10_000));
        assert_eq!(product.image_url.as_deref(), Some("/images/watch.png"));
        assert_eq!(product.description, "");
    }

    #[test]
    fn test_remote_doc_uses_document_id_and_image_url() {
        let raw = doc(json!({
            "id": "ignored",
            "name": "Earbuds",
            "price": 59.99,
            "category": "Accessories",
            "description": "Wireless",
            "imageUrl": "https://cdn.example/earbuds.png",
        }));
        let product =
            Product::from_document(Some(ProductId::new("abc123")), &raw, ProductSource::Remote)
                .unwrap();
        assert_eq!(product.id.as_str(), "abc123");
        assert_eq!(product.price, Price::from_cents(5_999));
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://cdn.example/earbuds.png")
        );
    }

    #[test]
    fn test_shape_errors() {
        let no_id = doc(json!({"name": "X", "price": "1"}));
        assert_eq!(
            Product::from_document(None, &no_id, ProductSource::Static),
            Err(ProductShapeError::MissingId)
        );
        let no_name = doc(json!({"id": 2, "price": "1"}));
        assert_eq!(
            Product::from_document(None, &no_name, ProductSource::Static),
            Err(ProductShapeError::MissingName)
        );
        let bad_price = doc(json!({"id": 3, "name": "X", "price": "cheap"}));
        assert!(matches!(
            Product::from_document(None, &bad_price, ProductSource::Static),
            Err(ProductShapeError::Price(_))
        ));
    }

    #[test]
    fn test_matches_term() {
        let raw = doc(json!({"id": 1, "name": "Smart Watch", "price": "1", "category": "Wearables"}));
        let product = Product::from_document(None, &raw, ProductSource::Static).unwrap();
        assert!(product.matches_term("watch"));
        assert!(product.matches_term("WEAR"));
        assert!(product.matches_term(""));
        assert!(!product.matches_term("phone"));
    }

    #[test]
    fn test_draft_to_document_normalises_price() {
        let draft = ProductDraft {
            name: " Tablet ".to_owned(),
            price: "$1,250".to_owned(),
            description: String::new(),
            category: "Gadgets".to_owned(),
        };
        let doc = draft.to_document().unwrap();
        assert_eq!(doc.get("price"), Some(&json!("1250.00")));
        assert_eq!(doc.get("name"), Some(&json!("Tablet")));
    }

    #[test]
    fn test_safe_file_name() {
        let upload = |name: &str| ImageUpload {
            file_name: name.to_owned(),
            bytes: Vec::new(),
        };
        assert_eq!(upload("photo.png").safe_file_name(), Some("photo.png"));
        assert_eq!(upload("C:\\tmp\\photo.png").safe_file_name(), Some("photo.png"));
        assert_eq!(upload("../..").safe_file_name(), None);
        assert_eq!(upload("dir/").safe_file_name(), None);
    }
}
