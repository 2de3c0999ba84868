//! Nuel Store storefront server.
//!
//! Serves the storefront HTTP API on port 3000.
//!
//! # Backends
//!
//! - With `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`): `PostgreSQL`
//!   documents and sessions. Run `nuel-cli migrate` first.
//! - Without: in-memory documents and sessions, lost on restart.
//!
//! Product images are always written to `STOREFRONT_BLOB_DIR` and served
//! under `/blobs`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use nuel_store_storefront::baas::DocumentStore;
use nuel_store_storefront::baas::postgres::{PgDocumentStore, create_pool};
use nuel_store_storefront::config::StorefrontConfig;
use nuel_store_storefront::middleware::create_session_layer;
use nuel_store_storefront::routes;
use nuel_store_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nuel_store_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let app = if let Some(database_url) = &config.database_url {
        let pool = create_pool(database_url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Database pool created");

        // NOTE: Migrations are NOT run automatically on startup.
        // Run them explicitly via: cargo run -p nuel-store-cli -- migrate
        let docs: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool.clone()));
        let state = AppState::with_documents(config.clone(), docs)
            .expect("Failed to initialize application state");
        let session_layer = create_session_layer(PostgresStore::new(pool), state.config());
        routes::app(state, session_layer)
    } else {
        tracing::warn!("No database configured, documents and sessions are kept in memory");
        let state = AppState::in_memory(config.clone())
            .expect("Failed to initialize application state");
        let session_layer = create_session_layer(MemoryStore::default(), state.config());
        routes::app(state, session_layer)
    };

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
