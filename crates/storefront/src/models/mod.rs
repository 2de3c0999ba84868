//! Domain models for the storefront.
//!
//! - [`product`] - canonical product shape and its normalisation from raw documents
//! - [`purchase`] - append-only purchase records
//! - [`user`] - per-user role documents
//! - [`session`] - values kept in the HTTP session

pub mod product;
pub mod purchase;
pub mod session;
pub mod user;

pub use product::{ImageUpload, Product, ProductDraft, ProductShapeError, ProductSource};
pub use purchase::{Purchase, PurchaseRecord};
pub use session::{CurrentUser, session_keys};
pub use user::UserRecord;

use serde::Serialize;
use serde_json::Value;

use crate::baas::Document;

/// Serialize a value into a document body.
///
/// # Errors
///
/// Returns an error if the value does not serialize to a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
