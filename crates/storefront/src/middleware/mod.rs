//! HTTP middleware and extractors for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. Request ID (set `x-request-id` if absent, echo it back)
//! 3. `TraceLayer` (request span carrying the request ID)
//! 4. Session layer (tower-sessions, memory or `PostgreSQL` store)
//!
//! # Extractors
//!
//! - [`CurrentSession`] - resolved [`SessionState`](crate::services::session::SessionState), never rejects
//! - [`RequireAuth`] - signed-in user, else 401
//! - [`RequireAdmin`] - signed-in admin, else 401/403
//! - [`SessionCart`] - the client's cart, restored from the session

pub mod auth;
pub mod session;

pub use auth::{
    CurrentSession, RequireAdmin, RequireAuth, clear_current_user, current_user,
    set_current_user,
};
pub use session::{SessionCart, create_session_layer};
