//! In-memory adapters.
//!
//! Not durable: all state is lost when the process exits. Used by tests and
//! by the storefront binary when no database is configured. Documents are
//! kept per collection in id order, guarded by `tokio::sync::RwLock`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    BackendError, BlobRef, BlobStore, DeviceStorage, Document, DocumentStore, StoredDocument,
    normalize_blob_path,
};

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn stored((id, data): (&String, &Document)) -> StoredDocument {
    StoredDocument {
        id: id.clone(),
        data: data.clone(),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, BackendError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(stored).collect())
            .unwrap_or_default())
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, BackendError> {
        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> Result<(), BackendError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_owned()).or_default();
        if docs.contains_key(id) {
            return Err(BackendError::Conflict(format!("{collection}/{id}")));
        }
        docs.insert(id.to_owned(), data);
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), BackendError> {
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), data);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> Result<(), BackendError> {
        let mut collections = self.collections.write().await;
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| BackendError::NotFound(format!("{collection}/{id}")))?;
        existing.extend(data);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, BackendError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| data.get(field) == Some(value))
                    .map(stored)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory [`BlobStore`]. URLs use the `memory://` scheme.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back a stored blob.
    pub async fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, BackendError> {
        let path = normalize_blob_path(path)?;
        self.blobs.write().await.insert(path.clone(), bytes);
        Ok(BlobRef { path })
    }

    async fn url(&self, blob: &BlobRef) -> Result<String, BackendError> {
        if !self.blobs.read().await.contains_key(&blob.path) {
            return Err(BackendError::NotFound(blob.path.clone()));
        }
        Ok(format!("memory://{}", blob.path))
    }
}

/// In-memory [`DeviceStorage`].
#[derive(Debug, Default)]
pub struct MemoryDeviceStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryDeviceStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStorage for MemoryDeviceStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        self.values.write().await.insert(key.to_owned(), value);
        Ok(())
    }
}
