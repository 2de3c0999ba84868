//! Checkout and order recording.
//!
//! A checkout turns the cart into one `purchases` document per line. All
//! lines share one timestamp and one order id and are written concurrently.
//! There is no transaction: when some writes fail the recorded lines stay
//! recorded, leave the cart, and the caller gets a [`PartialFailure`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use nuel_store_core::{Email, OrderId, PaymentMethod, Price, ProductId, PurchaseId, Quantity, UserId};

use crate::baas::collections::PURCHASES;
use crate::baas::{BackendError, DocumentStore, StoredDocument};
use crate::models::{Purchase, PurchaseRecord, to_document};
use crate::services::cart::{CartEntry, CartError, CartStore, CartTotals};
use crate::services::session::SessionState;

/// Card fields collected at checkout.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: SecretString,
    pub expiry: String,
    pub cvv: SecretString,
}

/// How the purchaser pays.
#[derive(Debug, Clone)]
pub enum PaymentDetails {
    CreditCard(CardDetails),
    Paypal,
    BankTransfer,
}

impl PaymentDetails {
    /// The payment method recorded on each purchase.
    #[must_use]
    pub const fn method(&self) -> PaymentMethod {
        match self {
            Self::CreditCard(_) => PaymentMethod::CreditCard,
            Self::Paypal => PaymentMethod::Paypal,
            Self::BankTransfer => PaymentMethod::BankTransfer,
        }
    }

    fn validate(&self) -> Result<(), CheckoutError> {
        let Self::CreditCard(card) = self else {
            return Ok(());
        };
        let missing = [
            ("card number", card.number.expose_secret().trim().is_empty()),
            ("expiry date", card.expiry.trim().is_empty()),
            ("cvv", card.cvv.expose_secret().trim().is_empty()),
        ];
        match missing.iter().find(|(_, blank)| *blank) {
            Some((field, _)) => Err(CheckoutError::InvalidPayment(format!("{field} is required"))),
            None => Ok(()),
        }
    }
}

/// A line that could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLine {
    pub product_id: ProductId,
    pub reason: String,
}

/// Outcome of a checkout where only some lines were recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialFailure {
    pub order_id: OrderId,
    /// Recorded lines; these have left the cart.
    pub recorded: Vec<ProductId>,
    /// Lines still in the cart.
    pub failed: Vec<FailedLine>,
}

/// Checkout errors.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("sign in to check out")]
    Unauthenticated,

    #[error("invalid payment details: {0}")]
    InvalidPayment(String),

    #[error("{} of {} lines could not be recorded", .0.failed.len(), .0.failed.len() + .0.recorded.len())]
    PartialFailure(Box<PartialFailure>),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// One receipt line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: Quantity,
    pub line_total: Price,
}

impl From<&CartEntry> for ReceiptLine {
    fn from(entry: &CartEntry) -> Self {
        Self {
            product_id: entry.product.id.clone(),
            name: entry.product.name.clone(),
            unit_price: entry.product.price,
            quantity: entry.quantity,
            line_total: entry.line_total(),
        }
    }
}

/// Summary of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub order_id: OrderId,
    pub lines: Vec<ReceiptLine>,
    pub totals: CartTotals,
    pub purchaser: Email,
    pub payment_method: PaymentMethod,
    pub date: DateTime<Utc>,
}

/// Writes purchase records and reads purchase history.
#[derive(Clone)]
pub struct CheckoutRecorder {
    docs: Arc<dyn DocumentStore>,
}

impl CheckoutRecorder {
    #[must_use]
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    /// Record the cart as purchases by the signed-in user.
    ///
    /// On full success the cart is cleared. On partial failure the recorded
    /// lines are removed from the cart and the failed ones stay.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `Unauthenticated` or `InvalidPayment` before
    /// anything is written, and `PartialFailure` if some writes failed.
    #[instrument(skip_all, fields(payment_method = %payment.method()))]
    pub async fn checkout(
        &self,
        cart: &CartStore,
        session: &SessionState,
        payment: &PaymentDetails,
    ) -> Result<Receipt, CheckoutError> {
        let snapshot = cart.snapshot();
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let user = session.user().ok_or(CheckoutError::Unauthenticated)?;
        payment.validate()?;

        let order_id = OrderId::generate();
        let date = Utc::now();
        let method = payment.method();

        let writes = snapshot.entries.iter().map(|entry| {
            let record = PurchaseRecord {
                product_id: entry.product.id.clone(),
                name: entry.product.name.clone(),
                description: entry.product.description.clone(),
                price: entry.product.price.amount,
                quantity: entry.quantity,
                total: entry.line_total().amount,
                payment_method: method,
                purchased_by: user.email.clone(),
                user_id: user.uid.clone(),
                date,
                order_id: order_id.clone(),
            };
            let docs = &self.docs;
            async move {
                let data = to_document(&record).map_err(BackendError::from)?;
                docs.add(PURCHASES, data).await
            }
        });
        let results = join_all(writes).await;

        let mut recorded = Vec::new();
        let mut failed = Vec::new();
        for (entry, result) in snapshot.entries.iter().zip(results) {
            match result {
                Ok(_) => recorded.push(entry.product.id.clone()),
                Err(e) => {
                    error!(product_id = %entry.product.id, error = %e, "failed to record purchase");
                    failed.push(FailedLine {
                        product_id: entry.product.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !failed.is_empty() {
            cart.remove_all(&recorded).await?;
            warn!(
                order_id = %order_id,
                recorded = recorded.len(),
                failed = failed.len(),
                "checkout partially recorded"
            );
            return Err(CheckoutError::PartialFailure(Box::new(PartialFailure {
                order_id,
                recorded,
                failed,
            })));
        }

        cart.clear().await?;
        info!(order_id = %order_id, lines = recorded.len(), "checkout recorded");

        Ok(Receipt {
            order_id,
            lines: snapshot.entries.iter().map(ReceiptLine::from).collect(),
            totals: CartTotals::compute(&snapshot.entries, cart.flat_discount()),
            purchaser: user.email.clone(),
            payment_method: method,
            date,
        })
    }

    /// Purchases made by one user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store cannot be queried.
    pub async fn purchases_for(&self, uid: &UserId) -> Result<Vec<Purchase>, CheckoutError> {
        let docs = self
            .docs
            .query_where(PURCHASES, "userId", &json!(uid.as_str()))
            .await?;
        Ok(parse_purchases(docs))
    }

    /// Every purchase, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store cannot be listed.
    pub async fn all_purchases(&self) -> Result<Vec<Purchase>, CheckoutError> {
        Ok(parse_purchases(self.docs.list(PURCHASES).await?))
    }
}

fn parse_purchases(docs: Vec<StoredDocument>) -> Vec<Purchase> {
    docs.into_iter()
        .filter_map(|doc| {
            match serde_json::from_value::<PurchaseRecord>(Value::Object(doc.data)) {
                Ok(record) => Some(Purchase {
                    id: PurchaseId::new(doc.id),
                    record,
                }),
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "skipping malformed purchase record");
                    None
                }
            }
        })
        .collect()
}
