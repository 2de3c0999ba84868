//! Core types for Nuel Store.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod payment;
pub mod price;
pub mod quantity;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use payment::PaymentMethod;
pub use price::{CurrencyCode, Price, PriceError};
pub use quantity::Quantity;
pub use role::Role;
