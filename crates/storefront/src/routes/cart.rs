//! Cart route handlers.
//!
//! The cart lives in the client's session. Every handler restores it through
//! [`SessionCart`], mutates it and answers with the resulting [`CartView`].

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use nuel_store_core::{ProductId, Quantity};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::SessionCart;
use crate::services::cart::{AddOutcome, CartEntry, CartStore, CartTotals};
use crate::state::AppState;

/// Cart contents and totals as returned to the client.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub entries: Vec<CartEntry>,
    pub item_count: u64,
    pub totals: CartTotals,
}

impl From<&CartStore> for CartView {
    fn from(cart: &CartStore) -> Self {
        let snapshot = cart.snapshot();
        let item_count = snapshot
            .entries
            .iter()
            .map(|e| u64::from(e.quantity.get()))
            .sum();
        Self {
            totals: cart.totals(),
            item_count,
            entries: snapshot.entries,
        }
    }
}

/// Body of `POST /cart/add` and `POST /cart/remove`.
#[derive(Debug, Deserialize)]
pub struct ProductRef {
    pub product_id: ProductId,
}

/// Body of `POST /cart/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantity {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    #[serde(flatten)]
    pub outcome: AddOutcome,
    pub cart: CartView,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    /// Stored quantity, absent when the product was not in the cart.
    pub quantity: Option<Quantity>,
    pub cart: CartView,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
    pub cart: CartView,
}

/// Show the cart.
pub async fn show(SessionCart(cart): SessionCart) -> Json<CartView> {
    Json(CartView::from(&cart))
}

/// Add a product, or increment it if already present.
#[instrument(skip(state, cart))]
pub async fn add(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
    Json(body): Json<ProductRef>,
) -> Result<Json<AddResponse>> {
    let product = state
        .catalog()
        .get(&body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", body.product_id)))?;

    add_breadcrumb(
        "cart",
        "Add to cart",
        &[("product_id", body.product_id.as_str())],
    );
    let outcome = cart.add(product).await?;

    Ok(Json(AddResponse {
        outcome,
        cart: CartView::from(&cart),
    }))
}

/// Set the quantity of a line. Values below one are stored as one.
#[instrument(skip(cart))]
pub async fn update(
    SessionCart(cart): SessionCart,
    Json(body): Json<UpdateQuantity>,
) -> Result<Json<UpdateResponse>> {
    let quantity = cart.set_quantity(&body.product_id, body.quantity).await?;
    Ok(Json(UpdateResponse {
        quantity,
        cart: CartView::from(&cart),
    }))
}

/// Remove a line. Removing a product that is not in the cart is a no-op.
#[instrument(skip(cart))]
pub async fn remove(
    SessionCart(cart): SessionCart,
    Json(body): Json<ProductRef>,
) -> Result<Json<RemoveResponse>> {
    add_breadcrumb(
        "cart",
        "Remove from cart",
        &[("product_id", body.product_id.as_str())],
    );
    let removed = cart.remove(&body.product_id).await?;
    Ok(Json(RemoveResponse {
        removed,
        cart: CartView::from(&cart),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use serde_json::json;

    use nuel_store_core::Price;

    use super::*;
    use crate::baas::memory::MemoryDeviceStorage;
    use crate::models::{Product, ProductSource};

    fn product(id: &str, price: &str) -> Product {
        let raw = json!({"id": id, "name": format!("Product {id}"), "price": price});
        Product::from_document(None, raw.as_object().unwrap(), ProductSource::Static).unwrap()
    }

    async fn cart_of(lines: &[(&str, &str)], quantity: i64) -> CartStore {
        let cart = CartStore::new(Arc::new(MemoryDeviceStorage::new()), Price::from_cents(1_000));
        for (id, price) in lines {
            cart.add(product(id, price)).await.unwrap();
            cart.set_quantity(&ProductId::new(*id), quantity).await.unwrap();
        }
        cart
    }

    #[tokio::test]
    async fn test_item_count_of_maximal_lines() {
        let cart = cart_of(&[("1", "1"), ("2", "1")], 9_999_999_999).await;

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2 * u64::from(u32::MAX));
    }

    #[tokio::test]
    async fn test_totals_of_most_expensive_lines() {
        let ceiling = "1000000000000";
        let cart = cart_of(&[("1", ceiling), ("2", ceiling)], i64::MAX).await;

        let view = CartView::from(&cart);
        let line = Price::MAX_AMOUNT * Decimal::from(u32::MAX);
        assert_eq!(view.totals.subtotal.amount, line * Decimal::TWO);
        assert!(view.totals.total.amount < view.totals.subtotal.amount);
    }
}
