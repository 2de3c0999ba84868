//! Nuel Store Core - Shared domain types.
//!
//! This crate provides the types used across all Nuel Store components:
//! - `storefront` - Catalog, cart, checkout and session services plus the HTTP API
//! - `cli` - Command-line tools for migrations, seeding and role management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, emails, roles
//!   and payment methods

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
