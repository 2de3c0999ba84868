//! Nuel Store storefront library.
//!
//! Catalog, cart, checkout and session services over backend-as-a-service
//! ports, plus the HTTP API that exposes them. The binary in `main.rs` wires
//! these to Postgres or in-memory backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod baas;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
