//! Product catalog.
//!
//! Merges the bundled static product list with the remote `products`
//! collection. The remote listing is cached with `moka`; admin mutations
//! invalidate it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use nuel_store_core::{PriceError, ProductId};

use crate::baas::collections::PRODUCTS;
use crate::baas::{BackendError, BlobStore, Document, DocumentStore};
use crate::models::{ImageUpload, Product, ProductDraft, ProductSource};

/// Categories an admin may assign.
pub const ADMIN_CATEGORIES: [&str; 6] = [
    "Gadgets",
    "Accessories",
    "Software",
    "Services",
    "Phones",
    "Wearables",
];

/// Blob directory for product images.
pub const PRODUCT_IMAGE_DIR: &str = "productImages";

const STATIC_PRODUCTS: &str = include_str!("../../data/products.json");
const REMOTE_KEY: &str = "remote";

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error("product {0} is part of the static catalog and cannot be changed")]
    ReadOnly(ProductId),

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error("invalid price: {0}")]
    Price(#[from] PriceError),

    #[error("static product list: {0}")]
    StaticList(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Product catalog over the static list and the remote collection.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    static_products: Vec<Product>,
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

/// Parse a JSON array of raw product entries.
///
/// Entries that cannot be normalised are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the input is not a JSON array of objects.
pub fn parse_static_products(json: &str) -> Result<Vec<Product>, serde_json::Error> {
    let raw: Vec<Document> = serde_json::from_str(json)?;
    Ok(raw
        .iter()
        .enumerate()
        .filter_map(
            |(index, data)| match Product::from_document(None, data, ProductSource::Static) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed static product");
                    None
                }
            },
        )
        .collect())
}

/// The product list bundled with the storefront.
///
/// # Errors
///
/// Returns an error if the bundled file is not a JSON array.
pub fn bundled_products() -> Result<Vec<Product>, serde_json::Error> {
    parse_static_products(STATIC_PRODUCTS)
}

impl Catalog {
    /// Create a catalog.
    #[must_use]
    pub fn new(
        static_products: Vec<Product>,
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        ttl: Duration,
    ) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self {
            inner: Arc::new(CatalogInner {
                static_products,
                docs,
                blobs,
                cache,
            }),
        }
    }

    /// Every product: static list first, then remote documents.
    ///
    /// On id collision the first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote collection cannot be listed.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        let remote = self.remote().await?;
        let mut seen = HashSet::new();
        let mut products = Vec::with_capacity(self.inner.static_products.len() + remote.len());

        for product in self.inner.static_products.iter().chain(remote.iter()) {
            if seen.insert(product.id.clone()) {
                products.push(product.clone());
            } else {
                warn!(id = %product.id, "duplicate product id, keeping first occurrence");
            }
        }
        Ok(products)
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote collection cannot be listed.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.list_all().await?.into_iter().find(|p| &p.id == id))
    }

    /// Products whose name or category contains `term` (case-insensitive),
    /// optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote collection cannot be listed.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        term: &str,
        category: Option<&str>,
    ) -> Result<Vec<Product>, CatalogError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|p| p.matches_term(term))
            .filter(|p| category.is_none_or(|c| p.category == c))
            .collect())
    }

    /// Distinct non-empty categories, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote collection cannot be listed.
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let mut seen = HashSet::new();
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .map(|p| p.category)
            .filter(|c| !c.is_empty() && seen.insert(c.clone()))
            .collect())
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Create a remote product. An image is required.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProduct` for a missing field, unknown category or
    /// missing image, `Price` for an unparseable price, and `Backend` if the
    /// upload or write fails.
    #[instrument(skip(self, draft, image), fields(name = %draft.name))]
    pub async fn create_product(
        &self,
        draft: ProductDraft,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let mut data = validate_draft(&draft)?;
        let image = image
            .ok_or_else(|| CatalogError::InvalidProduct("an image is required".to_owned()))?;
        let image_url = self.upload_image(image).await?;
        data.insert("imageUrl".to_owned(), json!(image_url));

        let id = self.inner.docs.add(PRODUCTS, data.clone()).await?;
        self.invalidate().await;
        tracing::info!(id = %id, "product created");

        Product::from_document(Some(ProductId::new(id)), &data, ProductSource::Remote)
            .map_err(|e| CatalogError::InvalidProduct(e.to_string()))
    }

    /// Replace the fields of a remote product, optionally with a new image.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` for static products, `NotFound` if no remote
    /// product has this id, and the validation errors of
    /// [`Self::create_product`].
    #[instrument(skip(self, draft, image))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        draft: ProductDraft,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        self.ensure_editable(id)?;
        let mut patch = validate_draft(&draft)?;
        if let Some(image) = image {
            let image_url = self.upload_image(image).await?;
            patch.insert("imageUrl".to_owned(), json!(image_url));
        }

        self.inner
            .docs
            .update(PRODUCTS, id.as_str(), patch)
            .await
            .map_err(|e| match e {
                BackendError::NotFound(_) => CatalogError::NotFound(id.clone()),
                other => CatalogError::Backend(other),
            })?;
        self.invalidate().await;

        let data = self
            .inner
            .docs
            .get(PRODUCTS, id.as_str())
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        Product::from_document(Some(id.clone()), &data, ProductSource::Remote)
            .map_err(|e| CatalogError::InvalidProduct(e.to_string()))
    }

    /// Delete a remote product.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` for static products and `NotFound` if no remote
    /// product has this id.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogError> {
        self.ensure_editable(id)?;
        if !self.inner.docs.delete(PRODUCTS, id.as_str()).await? {
            return Err(CatalogError::NotFound(id.clone()));
        }
        self.invalidate().await;
        tracing::info!(id = %id, "product deleted");
        Ok(())
    }

    async fn remote(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(products) = self.inner.cache.get(&REMOTE_KEY).await {
            return Ok(products);
        }

        let docs = self.inner.docs.list(PRODUCTS).await?;
        let products: Vec<Product> = docs
            .into_iter()
            .filter_map(|doc| {
                match Product::from_document(
                    Some(ProductId::new(doc.id.clone())),
                    &doc.data,
                    ProductSource::Remote,
                ) {
                    Ok(product) => Some(product),
                    Err(e) => {
                        warn!(id = %doc.id, error = %e, "skipping malformed product document");
                        None
                    }
                }
            })
            .collect();

        debug!(count = products.len(), "loaded remote products");
        let products = Arc::new(products);
        self.inner
            .cache
            .insert(REMOTE_KEY, Arc::clone(&products))
            .await;
        Ok(products)
    }

    async fn invalidate(&self) {
        self.inner.cache.invalidate(&REMOTE_KEY).await;
    }

    fn ensure_editable(&self, id: &ProductId) -> Result<(), CatalogError> {
        if self.inner.static_products.iter().any(|p| &p.id == id) {
            return Err(CatalogError::ReadOnly(id.clone()));
        }
        Ok(())
    }

    async fn upload_image(&self, image: ImageUpload) -> Result<String, CatalogError> {
        let file_name = image
            .safe_file_name()
            .ok_or_else(|| CatalogError::InvalidProduct("image file name is empty".to_owned()))?
            .to_owned();
        let blob = self
            .inner
            .blobs
            .upload(&format!("{PRODUCT_IMAGE_DIR}/{file_name}"), image.bytes)
            .await?;
        Ok(self.inner.blobs.url(&blob).await?)
    }
}

/// Check a draft's name and category and build its document fields.
///
/// # Errors
///
/// Returns `InvalidProduct` for a blank name or unknown category and
/// `Price` for an unparseable price.
pub fn validate_draft(draft: &ProductDraft) -> Result<Document, CatalogError> {
    if draft.name.trim().is_empty() {
        return Err(CatalogError::InvalidProduct("name is required".to_owned()));
    }
    let category = draft.category.trim();
    if !ADMIN_CATEGORIES.contains(&category) {
        return Err(CatalogError::InvalidProduct(format!(
            "unknown category {category:?}"
        )));
    }
    Ok(draft.to_document()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nuel_store_core::Price;
    use serde_json::Value;

    use super::*;
    use crate::baas::memory::{MemoryBlobStore, MemoryDocumentStore};

    struct Fixture {
        catalog: Catalog,
        docs: Arc<MemoryDocumentStore>,
        blobs: Arc<MemoryBlobStore>,
    }

    fn fixture(static_json: &str) -> Fixture {
        let docs = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let catalog = Catalog::new(
            parse_static_products(static_json).unwrap(),
            docs.clone(),
            blobs.clone(),
            Duration::from_secs(300),
        );
        Fixture {
            catalog,
            docs,
            blobs,
        }
    }

    fn doc(value: &Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn draft(name: &str, price: &str, category: &str) -> ProductDraft {
        ProductDraft {
            name: name.to_owned(),
            price: price.to_owned(),
            description: String::new(),
            category: category.to_owned(),
        }
    }

    fn image() -> ImageUpload {
        ImageUpload {
            file_name: "tablet.png".to_owned(),
            bytes: b"png".to_vec(),
        }
    }

    const STATIC: &str = r#"[
        {"id": 1, "name": "Smart Watch", "price": "100", "category": "Wearables", "image": "/w.png"},
        {"id": 2, "name": "Earbuds", "price": "$49.99", "category": "Accessories"},
        {"name": "No id", "price": "1"}
    ]"#;

    #[test]
    fn test_bundled_products_parse() {
        let products = bundled_products().unwrap();
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p.source == ProductSource::Static));
    }

    #[tokio::test]
    async fn test_list_all_merges_static_then_remote() {
        let f = fixture(STATIC);
        f.docs
            .set(
                PRODUCTS,
                "r1",
                doc(&json!({"name": "Tablet", "price": 250, "category": "Gadgets", "imageUrl": "u"})),
            )
            .await
            .unwrap();

        let ids: Vec<String> = f
            .catalog
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id.into_inner())
            .collect();
        assert_eq!(ids, ["1", "2", "r1"]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first_and_malformed_docs_are_skipped() {
        let f = fixture(STATIC);
        f.docs
            .set(PRODUCTS, "1", doc(&json!({"name": "Impostor", "price": "5"})))
            .await
            .unwrap();
        f.docs
            .set(PRODUCTS, "bad", doc(&json!({"name": "Broken", "price": "free"})))
            .await
            .unwrap();

        let products = f.catalog.list_all().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products.first().unwrap().name, "Smart Watch");
    }

    #[tokio::test]
    async fn test_search_and_categories() {
        let f = fixture(STATIC);

        let hits = f.catalog.search("WATCH", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        let by_category = f.catalog.search("", Some("Accessories")).await.unwrap();
        assert_eq!(by_category.first().unwrap().name, "Earbuds");
        assert!(f.catalog.search("watch", Some("Phones")).await.unwrap().is_empty());

        assert_eq!(
            f.catalog.categories().await.unwrap(),
            ["Wearables", "Accessories"]
        );
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let f = fixture(STATIC);
        let product = f.catalog.get(&ProductId::new("2")).await.unwrap().unwrap();
        assert_eq!(product.price, Price::from_cents(4_999));
        assert!(f.catalog.get(&ProductId::new("99")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_product_uploads_image_and_invalidates_cache() {
        let f = fixture(STATIC);
        assert_eq!(f.catalog.list_all().await.unwrap().len(), 2);

        let product = f
            .catalog
            .create_product(draft("Tablet", "$250", "Gadgets"), Some(image()))
            .await
            .unwrap();
        assert_eq!(product.source, ProductSource::Remote);
        assert_eq!(
            product.image_url.as_deref(),
            Some("memory://productImages/tablet.png")
        );
        assert_eq!(
            f.blobs.bytes("productImages/tablet.png").await.as_deref(),
            Some(b"png".as_slice())
        );

        assert_eq!(f.catalog.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_create_product_validation() {
        let f = fixture(STATIC);

        let no_image = f
            .catalog
            .create_product(draft("Tablet", "250", "Gadgets"), None)
            .await;
        assert!(matches!(no_image, Err(CatalogError::InvalidProduct(_))));

        let bad_category = f
            .catalog
            .create_product(draft("Tablet", "250", "Toys"), Some(image()))
            .await;
        assert!(matches!(bad_category, Err(CatalogError::InvalidProduct(_))));

        let bad_price = f
            .catalog
            .create_product(draft("Tablet", "cheap", "Gadgets"), Some(image()))
            .await;
        assert!(matches!(bad_price, Err(CatalogError::Price(_))));

        let absurd_price = f
            .catalog
            .create_product(
                draft("Tablet", "100000000000000000000", "Gadgets"),
                Some(image()),
            )
            .await;
        assert!(matches!(
            absurd_price,
            Err(CatalogError::Price(PriceError::TooLarge))
        ));

        assert!(f.docs.list(PRODUCTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_remote_product() {
        let f = fixture(STATIC);
        let created = f
            .catalog
            .create_product(draft("Tablet", "250", "Gadgets"), Some(image()))
            .await
            .unwrap();

        let updated = f
            .catalog
            .update_product(&created.id, draft("Tablet Pro", "300", "Gadgets"), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Tablet Pro");
        assert_eq!(updated.price, Price::from_cents(30_000));
        assert_eq!(updated.image_url, created.image_url);

        f.catalog.delete_product(&created.id).await.unwrap();
        assert!(f.catalog.get(&created.id).await.unwrap().is_none());
        assert!(matches!(
            f.catalog.delete_product(&created.id).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_static_products_are_read_only() {
        let f = fixture(STATIC);
        let id = ProductId::new("1");
        assert!(matches!(
            f.catalog
                .update_product(&id, draft("X", "1", "Gadgets"), None)
                .await,
            Err(CatalogError::ReadOnly(_))
        ));
        assert!(matches!(
            f.catalog.delete_product(&id).await,
            Err(CatalogError::ReadOnly(_))
        ));
    }
}
