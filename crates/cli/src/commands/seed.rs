//! Seed the product collection from a YAML file.
//!
//! # File Format
//!
//! ```yaml
//! products:
//!   - name: Trail Headphones
//!     price: "$89.99"
//!     category: Accessories
//!     description: Closed-back, foldable.
//!     image_url: https://cdn.example.com/headphones.png
//! ```
//!
//! Every entry is validated like an admin form before anything is written.

use std::path::Path;

use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use nuel_store_storefront::baas::postgres::PgDocumentStore;
use nuel_store_storefront::baas::{Document, DocumentStore, collections::PRODUCTS};
use nuel_store_storefront::models::ProductDraft;
use nuel_store_storefront::services::catalog::validate_draft;

use super::{CliError, connect};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry. Seeded products carry an image URL instead of an upload.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(flatten)]
    pub draft: ProductDraft,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Validate every entry and build its document.
///
/// Returns one message per invalid entry when any entry is invalid.
pub fn prepare(seed: &SeedFile) -> Result<Vec<Document>, Vec<String>> {
    let mut docs = Vec::with_capacity(seed.products.len());
    let mut errors = Vec::new();

    for (index, product) in seed.products.iter().enumerate() {
        match validate_draft(&product.draft) {
            Ok(mut doc) => {
                if let Some(url) = product.image_url.as_deref().map(str::trim)
                    && !url.is_empty()
                {
                    doc.insert("imageUrl".to_owned(), json!(url));
                }
                docs.push(doc);
            }
            Err(e) => errors.push(format!("entry {index} ({}): {e}", product.draft.name)),
        }
    }

    if errors.is_empty() { Ok(docs) } else { Err(errors) }
}

/// Seed products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a database write fails.
pub async fn products(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::Io(file_path.to_owned(), e))?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(products = seed.products.len(), "Parsed seed file");

    let docs = prepare(&seed).map_err(|errors| {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        CliError::InvalidSeed(errors.len())
    })?;

    let store = PgDocumentStore::new(connect().await?);
    for doc in docs {
        let id = store.add(PRODUCTS, doc).await?;
        info!(id = %id, "Product seeded");
    }

    info!("Seeding complete!");
    Ok(())
}
