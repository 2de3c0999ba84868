//! Application state shared across handlers.

use std::sync::Arc;

use tower_sessions::Session;

use crate::baas::fs::FsBlobStore;
use crate::baas::memory::MemoryDocumentStore;
use crate::baas::session::SessionStorage;
use crate::baas::{AccountsAuth, AuthProvider, BackendError, BlobStore, DocumentStore};
use crate::config::StorefrontConfig;
use crate::services::auth::AuthService;
use crate::services::cart::{CartError, CartStore};
use crate::services::catalog::{Catalog, bundled_products};
use crate::services::checkout::CheckoutRecorder;
use crate::services::session::SessionGate;

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("static product list: {0}")]
    StaticProducts(#[from] serde_json::Error),
    #[error("blob store: {0}")]
    BlobStore(#[from] BackendError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend ports and the services built on them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    docs: Arc<dyn DocumentStore>,
    auth: AuthService,
    catalog: Catalog,
    checkout: CheckoutRecorder,
}

impl AppState {
    /// Create a new application state over the given backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled product list cannot be parsed.
    pub fn new(
        config: StorefrontConfig,
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        auth_provider: Arc<dyn AuthProvider>,
    ) -> Result<Self, StateError> {
        let catalog = Catalog::new(
            bundled_products()?,
            Arc::clone(&docs),
            blobs,
            config.catalog_ttl,
        );
        let auth = AuthService::new(auth_provider, Arc::clone(&docs));
        let checkout = CheckoutRecorder::new(Arc::clone(&docs));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                docs,
                auth,
                catalog,
                checkout,
            }),
        })
    }

    /// State over in-memory documents and filesystem blobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob store base URL is invalid or the bundled
    /// product list cannot be parsed.
    pub fn in_memory(config: StorefrontConfig) -> Result<Self, StateError> {
        let docs: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        Self::with_documents(config, docs)
    }

    /// State over the given document store, filesystem blobs and
    /// document-backed password accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob store base URL is invalid or the bundled
    /// product list cannot be parsed.
    pub fn with_documents(
        config: StorefrontConfig,
        docs: Arc<dyn DocumentStore>,
    ) -> Result<Self, StateError> {
        let blobs = Arc::new(FsBlobStore::new(&config.blob_dir, &config.base_url)?);
        let accounts = Arc::new(AccountsAuth::new(Arc::clone(&docs)));
        Self::new(config, docs, blobs, accounts)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn docs(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.docs
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the checkout recorder.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutRecorder {
        &self.inner.checkout
    }

    /// A fresh session gate. One per request.
    #[must_use]
    pub fn session_gate(&self) -> SessionGate {
        SessionGate::new(
            Arc::clone(&self.inner.docs),
            self.inner.config.role_lookup_timeout,
        )
    }

    /// The cart kept in this client's session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session or catalog cannot be read.
    pub async fn cart(&self, session: &Session) -> Result<CartStore, CartError> {
        CartStore::load(
            Arc::new(SessionStorage::new(session.clone())),
            &self.inner.catalog,
            self.inner.config.flat_discount,
        )
        .await
    }
}
