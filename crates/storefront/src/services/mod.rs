//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-up, sign-in and profile updates over the auth provider
//! - `cart` - Per-client cart with quantities persisted to device storage
//! - `catalog` - Bundled and remote products, search, admin edits
//! - `checkout` - Purchase recording and purchase history
//! - `session` - Session state and admin role resolution

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod session;
