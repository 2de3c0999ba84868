//! Purchase records.
//!
//! One record is written per cart line at checkout. Records are append-only:
//! nothing in the storefront updates or deletes them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nuel_store_core::{Email, OrderId, PaymentMethod, ProductId, PurchaseId, Quantity, UserId};

/// The body of a `purchases` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price.
    pub price: Decimal,
    pub quantity: Quantity,
    /// Line total (`price * quantity`).
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    /// Purchaser email.
    #[serde(rename = "purchasedby")]
    pub purchased_by: Email,
    pub user_id: UserId,
    /// Shared by every line of one checkout.
    pub date: DateTime<Utc>,
    /// Groups the lines of one checkout.
    pub order_id: OrderId,
}

/// A stored purchase record with its document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    #[serde(flatten)]
    pub record: PurchaseRecord,
}
