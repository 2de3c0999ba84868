//! Integration test harness for Nuel Store.
//!
//! [`TestContext::spawn`] starts the storefront on an ephemeral port with
//! in-memory documents and sessions and a throwaway blob directory. Each
//! [`Client`] from [`TestContext::client`] has its own cookie jar, so it
//! acts as a separate device.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p nuel-store-integration-tests
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tower_sessions::MemoryStore;

use nuel_store_storefront::baas::collections::USERS;
use nuel_store_storefront::baas::memory::MemoryDocumentStore;
use nuel_store_storefront::baas::{Document, DocumentStore};
use nuel_store_storefront::config::StorefrontConfig;
use nuel_store_storefront::middleware::create_session_layer;
use nuel_store_storefront::routes;
use nuel_store_storefront::state::AppState;

/// Default password used by [`TestContext::sign_up`].
pub const PASSWORD: &str = "correct horse battery";

/// A running storefront.
pub struct TestContext {
    pub base_url: String,
    pub docs: Arc<MemoryDocumentStore>,
    blob_dir: PathBuf,
}

impl TestContext {
    /// Start a storefront on `127.0.0.1` with a random port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the state cannot be built.
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let base_url = format!("http://{addr}");

        let blob_dir = std::env::temp_dir().join(format!("nuel-blobs-{}", uuid::Uuid::new_v4()));
        let config = StorefrontConfig::local(&base_url, &blob_dir);

        let docs = Arc::new(MemoryDocumentStore::new());
        let shared: Arc<dyn DocumentStore> = docs.clone();
        let state =
            AppState::with_documents(config, shared).expect("Failed to build application state");
        let session_layer = create_session_layer(MemoryStore::default(), state.config());
        let app = routes::app(state, session_layer);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test server failed");
        });

        Self {
            base_url,
            docs,
            blob_dir,
        }
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A client with its own cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Sign up `username` on `client` and return the session state.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or sign-up is rejected.
    pub async fn sign_up(&self, client: &Client, username: &str) -> Value {
        let resp = client
            .post(self.url("/auth/signup"))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
                "confirm_password": PASSWORD,
            }))
            .send()
            .await
            .expect("Sign-up request failed");
        assert_eq!(resp.status(), StatusCode::OK, "sign-up rejected");
        resp.json().await.expect("Sign-up response is not JSON")
    }

    /// Give the user with this uid the admin role.
    ///
    /// # Panics
    ///
    /// Panics if the user document cannot be updated.
    pub async fn grant_admin(&self, uid: &str) {
        let mut patch = Document::new();
        patch.insert("role".to_owned(), json!("admin"));
        self.docs
            .update(USERS, uid, patch)
            .await
            .expect("Failed to grant admin role");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.blob_dir);
    }
}
