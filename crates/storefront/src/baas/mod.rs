//! Backend-as-a-service ports and adapters.
//!
//! The storefront delegates persistence, authentication and file storage to
//! an external platform. Each capability is described by a trait ("port")
//! with a small CRUD contract:
//!
//! - [`DocumentStore`] - JSON documents addressed by collection + id
//! - [`BlobStore`] - uploaded bytes addressed by path, served by URL
//! - [`DeviceStorage`] - per-client string key/value storage (cart only)
//! - [`AuthProvider`] - email/password accounts and profiles
//!
//! # Adapters
//!
//! - [`memory`] - in-process implementations for tests and local development
//! - [`postgres`] - `PostgreSQL` JSONB document store
//! - [`fs`] - filesystem blob store served under `/blobs`
//! - [`session`] - device storage kept in the HTTP session
//! - [`accounts`] - password accounts stored as documents (Argon2id hashes)

pub mod accounts;
pub mod auth;
pub mod fs;
pub mod memory;
pub mod postgres;
pub mod session;

pub use accounts::AccountsAuth;
pub use auth::{AuthError, AuthProvider, AuthUser, ProfileUpdate};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON document body.
pub type Document = Map<String, Value>;

/// Collection names used by the storefront.
pub mod collections {
    /// Remote product documents.
    pub const PRODUCTS: &str = "products";
    /// Append-only purchase records, one per cart line.
    pub const PURCHASES: &str = "purchases";
    /// Per-user profile and role documents, keyed by uid.
    pub const USERS: &str = "users";
    /// Password accounts used by [`super::AccountsAuth`].
    pub const ACCOUNTS: &str = "accounts";
    /// Lowercased email to account uid, one document per address.
    pub const ACCOUNT_EMAILS: &str = "accountEmails";
}

/// Errors returned by BaaS adapters.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The addressed document or blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The path or key is not acceptable to the adapter.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The backend did not answer in time.
    #[error("backend timed out")]
    Timeout,

    /// The backend is unreachable or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A document together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document id within its collection.
    pub id: String,
    /// Document body.
    pub data: Document,
}

/// Document database port.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError>;

    /// List every document of a collection. No pagination.
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, BackendError>;

    /// Insert a document under a generated id and return the id.
    async fn add(&self, collection: &str, data: Document) -> Result<String, BackendError>;

    /// Insert a document under a known id, only if that id is free.
    ///
    /// Returns [`BackendError::Conflict`] if the document already exists.
    async fn create(&self, collection: &str, id: &str, data: Document)
    -> Result<(), BackendError>;

    /// Create or replace a document under a known id.
    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), BackendError>;

    /// Shallow-merge fields into an existing document.
    ///
    /// Returns [`BackendError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, data: Document)
    -> Result<(), BackendError>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, BackendError>;

    /// All documents whose top-level `field` equals `value`.
    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, BackendError>;
}

/// Reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Normalised storage path (e.g. `productImages/phone.png`).
    pub path: String,
}

/// Blob storage port.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, replacing anything already there.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, BackendError>;

    /// Public download URL for a stored blob.
    async fn url(&self, blob: &BlobRef) -> Result<String, BackendError>;
}

/// Per-client key/value storage.
///
/// Plays the role of the browser's local storage: it survives between
/// visits of the same client and is never shared between clients.
#[async_trait]
pub trait DeviceStorage: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: String) -> Result<(), BackendError>;
}

/// Normalise a blob path: forward slashes, no empty, `.` or `..` segments.
///
/// # Errors
///
/// Returns [`BackendError::InvalidPath`] if nothing usable remains or a
/// segment tries to escape the store root.
pub fn normalize_blob_path(path: &str) -> Result<String, BackendError> {
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(BackendError::InvalidPath(path.to_owned())),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(BackendError::InvalidPath(path.to_owned()));
    }
    Ok(segments.join("/"))
}
