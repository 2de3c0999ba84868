//! Cart store.
//!
//! A [`CartStore`] is a cheap-to-clone handle over one client's cart. Entries
//! are unique by product id and keep insertion order. Every mutation
//! publishes a fresh [`CartSnapshot`] to subscribers and rewrites the
//! client's device storage under [`STORAGE_KEY`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use nuel_store_core::{Price, ProductId, Quantity};

use crate::baas::{BackendError, DeviceStorage};
use crate::models::Product;
use crate::services::catalog::{Catalog, CatalogError};

/// Device-storage key holding the persisted cart.
pub const STORAGE_KEY: &str = "quantities";

/// Default flat discount applied to a non-empty cart, in cents.
pub const FLAT_DISCOUNT_CENTS: i64 = 1_000;

/// Cart errors.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart storage: {0}")]
    Storage(#[from] BackendError),

    #[error("cart serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// One product-quantity pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartEntry {
    pub product: Product,
    pub quantity: Quantity,
}

impl CartEntry {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity.get()
    }
}

/// Subtotal, discount and total of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Price,
    pub discount: Price,
    pub total: Price,
}

impl CartTotals {
    /// Totals for `entries` with a flat discount.
    ///
    /// The discount only applies to a non-empty cart and the total never
    /// drops below zero.
    #[must_use]
    pub fn compute(entries: &[CartEntry], flat_discount: Price) -> Self {
        let subtotal = entries
            .iter()
            .map(CartEntry::line_total)
            .fold(Price::zero(), |acc, line| acc + line);
        let discount = if entries.is_empty() {
            Price::zero()
        } else {
            flat_discount
        };
        Self {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
        }
    }
}

/// Immutable view of the cart at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartSnapshot {
    pub entries: Vec<CartEntry>,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Quantity of one product, if it is in the cart.
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId) -> Option<Quantity> {
        self.entries
            .iter()
            .find(|e| &e.product.id == id)
            .map(|e| e.quantity)
    }
}

/// What [`CartStore::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "quantity", rename_all = "lowercase")]
pub enum AddOutcome {
    /// A new entry with quantity one.
    Added,
    /// The existing entry now has this quantity.
    Incremented(Quantity),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredLine {
    id: ProductId,
    quantity: Quantity,
}

/// Handle over one client's cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    entries: Mutex<Vec<CartEntry>>,
    // Serialises mutate-then-persist so storage sees writes in order.
    write_lock: tokio::sync::Mutex<()>,
    changes: watch::Sender<CartSnapshot>,
    storage: Arc<dyn DeviceStorage>,
    flat_discount: Price,
}

impl CartStore {
    /// An empty cart persisting to `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn DeviceStorage>, flat_discount: Price) -> Self {
        Self::with_entries(storage, flat_discount, Vec::new())
    }

    fn with_entries(
        storage: Arc<dyn DeviceStorage>,
        flat_discount: Price,
        entries: Vec<CartEntry>,
    ) -> Self {
        let (changes, _) = watch::channel(CartSnapshot {
            entries: entries.clone(),
        });
        Self {
            inner: Arc::new(CartInner {
                entries: Mutex::new(entries),
                write_lock: tokio::sync::Mutex::new(()),
                changes,
                storage,
                flat_discount,
            }),
        }
    }

    /// Restore a cart from device storage.
    ///
    /// Persisted ids are resolved through the catalog; ids the catalog no
    /// longer knows are dropped and the pruned cart is written back. A
    /// malformed stored value is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or written, or the catalog
    /// cannot be listed.
    #[instrument(skip_all)]
    pub async fn load(
        storage: Arc<dyn DeviceStorage>,
        catalog: &Catalog,
        flat_discount: Price,
    ) -> Result<Self, CartError> {
        let Some(raw) = storage.get(STORAGE_KEY).await? else {
            return Ok(Self::new(storage, flat_discount));
        };

        let (lines, malformed) = match serde_json::from_str::<Vec<StoredLine>>(&raw) {
            Ok(lines) => (lines, false),
            Err(e) => {
                warn!(error = %e, "discarding malformed stored cart");
                (Vec::new(), true)
            }
        };
        let stored_count = lines.len();

        let products: HashMap<ProductId, Product> = catalog
            .list_all()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut entries: Vec<CartEntry> = Vec::with_capacity(lines.len());
        for line in lines {
            if entries.iter().any(|e| e.product.id == line.id) {
                continue;
            }
            match products.get(&line.id) {
                Some(product) => entries.push(CartEntry {
                    product: product.clone(),
                    quantity: line.quantity,
                }),
                None => warn!(id = %line.id, "dropping cart line for unknown product"),
            }
        }

        let pruned = malformed || entries.len() != stored_count;
        let cart = Self::with_entries(storage, flat_discount, entries);
        if pruned {
            cart.persist(&cart.snapshot()).await?;
        }
        debug!(lines = cart.snapshot().len(), "cart restored");
        Ok(cart)
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted. The in-memory cart
    /// keeps the change.
    #[instrument(skip(self, product), fields(id = %product.id))]
    pub async fn add(&self, product: Product) -> Result<AddOutcome, CartError> {
        self.mutate(|entries| {
            if let Some(entry) = entries.iter_mut().find(|e| e.product.id == product.id) {
                entry.quantity = entry.quantity.incremented();
                AddOutcome::Incremented(entry.quantity)
            } else {
                entries.push(CartEntry {
                    product,
                    quantity: Quantity::ONE,
                });
                AddOutcome::Added
            }
        })
        .await
    }

    /// Remove the entry for `id`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &ProductId) -> Result<bool, CartError> {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|e| &e.product.id != id);
            entries.len() != before
        })
        .await
    }

    /// Remove every entry whose id is in `ids`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn remove_all(&self, ids: &[ProductId]) -> Result<usize, CartError> {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|e| !ids.contains(&e.product.id));
            before - entries.len()
        })
        .await
    }

    /// Set the quantity of an existing entry, clamping below one to one.
    ///
    /// Returns the stored quantity, or `None` if `id` is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        id: &ProductId,
        quantity: i64,
    ) -> Result<Option<Quantity>, CartError> {
        let quantity = Quantity::clamped(quantity);
        self.mutate(|entries| {
            entries
                .iter_mut()
                .find(|e| &e.product.id == id)
                .map(|entry| {
                    entry.quantity = quantity;
                    quantity
                })
        })
        .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn clear(&self) -> Result<(), CartError> {
        self.mutate(Vec::clear).await
    }

    /// The current contents.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            entries: self.entries().clone(),
        }
    }

    /// Receive a snapshot after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.changes.subscribe()
    }

    /// Totals of the current contents.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals::compute(&self.entries(), self.inner.flat_discount)
    }

    /// The flat discount this cart applies.
    #[must_use]
    pub fn flat_discount(&self) -> Price {
        self.inner.flat_discount
    }

    fn entries(&self) -> MutexGuard<'_, Vec<CartEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<CartEntry>) -> R) -> Result<R, CartError> {
        let _write = self.inner.write_lock.lock().await;
        let (result, snapshot) = {
            let mut entries = self.entries();
            let result = f(&mut entries);
            (
                result,
                CartSnapshot {
                    entries: entries.clone(),
                },
            )
        };
        self.inner.changes.send_replace(snapshot.clone());
        self.persist(&snapshot).await?;
        Ok(result)
    }

    async fn persist(&self, snapshot: &CartSnapshot) -> Result<(), CartError> {
        let lines: Vec<StoredLine> = snapshot
            .entries
            .iter()
            .map(|e| StoredLine {
                id: e.product.id.clone(),
                quantity: e.quantity,
            })
            .collect();
        let raw = serde_json::to_string(&lines)?;
        self.inner.storage.set(STORAGE_KEY, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::baas::memory::{MemoryBlobStore, MemoryDeviceStorage, MemoryDocumentStore};
    use crate::models::ProductSource;
    use crate::services::catalog::parse_static_products;

    fn product(id: &str, price: &str) -> Product {
        let raw = json!({"id": id, "name": format!("Product {id}"), "price": price});
        Product::from_document(None, raw.as_object().unwrap(), ProductSource::Static).unwrap()
    }

    fn discount() -> Price {
        Price::from_cents(FLAT_DISCOUNT_CENTS)
    }

    fn cart() -> (CartStore, Arc<MemoryDeviceStorage>) {
        let storage = Arc::new(MemoryDeviceStorage::new());
        (CartStore::new(storage.clone(), discount()), storage)
    }

    fn catalog() -> Catalog {
        let products = parse_static_products(
            r#"[{"id": 1, "name": "Watch", "price": "100"}, {"id": 2, "name": "Case", "price": "5"}]"#,
        )
        .unwrap();
        Catalog::new(
            products,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryBlobStore::new()),
            Duration::from_secs(60),
        )
    }

    struct BrokenStorage;

    #[async_trait]
    impl DeviceStorage for BrokenStorage {
        async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("disk full".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_adding_twice_increments_single_entry() {
        let (cart, _) = cart();
        assert_eq!(cart.add(product("1", "100")).await.unwrap(), AddOutcome::Added);
        assert_eq!(
            cart.add(product("1", "100")).await.unwrap(),
            AddOutcome::Incremented(Quantity::new(2))
        );

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.quantity_of(&ProductId::new("1")),
            Some(Quantity::new(2))
        );
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (cart, _) = cart();
        cart.add(product("1", "100")).await.unwrap();

        assert!(!cart.remove(&ProductId::new("9")).await.unwrap());
        assert_eq!(cart.snapshot().len(), 1);
        assert!(cart.remove(&ProductId::new("1")).await.unwrap());
        assert!(cart.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_clamps_and_ignores_unknown() {
        let (cart, storage) = cart();
        cart.add(product("1", "100")).await.unwrap();

        assert_eq!(
            cart.set_quantity(&ProductId::new("1"), 0).await.unwrap(),
            Some(Quantity::ONE)
        );
        assert_eq!(
            cart.set_quantity(&ProductId::new("1"), -4).await.unwrap(),
            Some(Quantity::ONE)
        );
        assert_eq!(cart.set_quantity(&ProductId::new("2"), 5).await.unwrap(), None);

        let raw = storage.get(STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(raw, r#"[{"id":"1","quantity":1}]"#);
    }

    #[tokio::test]
    async fn test_totals_apply_flat_discount() {
        let (cart, _) = cart();
        assert_eq!(
            cart.totals(),
            CartTotals {
                subtotal: Price::zero(),
                discount: Price::zero(),
                total: Price::zero(),
            }
        );

        cart.add(product("1", "100")).await.unwrap();
        cart.set_quantity(&ProductId::new("1"), 3).await.unwrap();
        let totals = cart.totals();
        assert_eq!(totals.subtotal, Price::from_cents(30_000));
        assert_eq!(totals.discount, Price::from_cents(1_000));
        assert_eq!(totals.total, Price::from_cents(29_000));
    }

    #[tokio::test]
    async fn test_total_never_negative() {
        let (cart, _) = cart();
        cart.add(product("1", "4.50")).await.unwrap();
        assert_eq!(cart.totals().total, Price::zero());
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mutation() {
        let (cart, _) = cart();
        let mut changes = cart.subscribe();

        cart.add(product("1", "100")).await.unwrap();
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().len(), 1);

        cart.clear().await.unwrap();
        assert!(changes.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn test_load_restores_order_and_drops_unknown_ids() {
        let storage = Arc::new(MemoryDeviceStorage::new());
        storage
            .set(
                STORAGE_KEY,
                r#"[{"id":"2","quantity":4},{"id":"gone","quantity":1},{"id":"1","quantity":0}]"#
                    .to_owned(),
            )
            .await
            .unwrap();

        let cart = CartStore::load(storage.clone(), &catalog(), discount())
            .await
            .unwrap();
        let snapshot = cart.snapshot();
        let ids: Vec<&str> = snapshot
            .entries
            .iter()
            .map(|e| e.product.id.as_str())
            .collect();
        assert_eq!(ids, ["2", "1"]);
        assert_eq!(snapshot.quantity_of(&ProductId::new("2")), Some(Quantity::new(4)));
        assert_eq!(snapshot.quantity_of(&ProductId::new("1")), Some(Quantity::ONE));

        let raw = storage.get(STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(raw, r#"[{"id":"2","quantity":4},{"id":"1","quantity":1}]"#);
    }

    #[tokio::test]
    async fn test_load_discards_malformed_value() {
        let storage = Arc::new(MemoryDeviceStorage::new());
        storage
            .set(STORAGE_KEY, "{not json".to_owned())
            .await
            .unwrap();
        let cart = CartStore::load(storage.clone(), &catalog(), discount())
            .await
            .unwrap();
        assert!(cart.snapshot().is_empty());
        assert_eq!(storage.get(STORAGE_KEY).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported() {
        let cart = CartStore::new(Arc::new(BrokenStorage), discount());
        let err = cart.add(product("1", "100")).await.unwrap_err();
        assert!(matches!(err, CartError::Storage(BackendError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_remove_all() {
        let (cart, _) = cart();
        cart.add(product("1", "100")).await.unwrap();
        cart.add(product("2", "5")).await.unwrap();
        cart.add(product("3", "7")).await.unwrap();

        let removed = cart
            .remove_all(&[ProductId::new("1"), ProductId::new("3")])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cart.snapshot().len(), 1);
    }
}
