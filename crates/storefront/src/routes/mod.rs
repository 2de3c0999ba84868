//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Catalog
//! GET  /products               - Product listing (?q=term&category=name)
//! GET  /products/{id}          - Product detail
//! GET  /categories             - Distinct categories
//!
//! # Cart (kept in the session)
//! GET  /cart                   - Cart entries and totals
//! POST /cart/add               - Add a product, or increment it
//! POST /cart/update            - Set a line quantity
//! POST /cart/remove            - Remove a line
//!
//! # Checkout
//! POST /checkout               - Record the cart as purchases
//! GET  /checkout/receipt       - Receipt page for the last checkout (HTML)
//!
//! # Auth
//! POST /auth/signup            - Create an account and sign in
//! POST /auth/login             - Sign in
//! POST /auth/logout            - Sign out
//! GET  /auth/session           - Current session state
//!
//! # Account (requires auth)
//! POST /account/profile        - Update display name / photo
//! GET  /account/purchases      - Purchase history
//!
//! # Admin (requires admin role)
//! GET    /admin/products       - All products
//! POST   /admin/products       - Create a product (multipart, image required)
//! PUT    /admin/products/{id}  - Edit a product (multipart, image optional)
//! DELETE /admin/products/{id}  - Delete a product
//! GET    /admin/purchases      - All purchases
//!
//! GET  /blobs/*                - Uploaded product images
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post, put},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Upper bound on admin multipart bodies (product image plus fields).
const ADMIN_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", post(account::update_profile))
        .route("/purchases", get(account::purchases))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/purchases", get(admin::purchases))
        .layer(DefaultBodyLimit::max(ADMIN_BODY_LIMIT))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Catalog
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/categories", get(products::categories))
        // Cart
        .nest("/cart", cart_routes())
        // Checkout
        .route("/checkout", post(checkout::checkout))
        .route("/checkout/receipt", get(checkout::receipt))
        // Auth
        .nest("/auth", auth_routes())
        // Account
        .nest("/account", account_routes())
        // Admin
        .nest("/admin", admin_routes())
}

/// Assemble the full application: routes, blob files, session, tracing
/// and Sentry layers.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let blobs = ServeDir::new(&state.config().blob_dir);

    routes()
        .nest_service("/blobs", blobs)
        .layer(session_layer)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
