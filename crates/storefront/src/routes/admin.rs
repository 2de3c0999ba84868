//! Admin route handlers (require the admin role).
//!
//! Product forms arrive as `multipart/form-data` with the text fields
//! `name`, `price`, `description`, `category` and an `image` file.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use tracing::instrument;

use nuel_store_core::ProductId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::models::{ImageUpload, Product, ProductDraft, Purchase};
use crate::state::AppState;

/// Every product, bundled and remote.
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list_all().await?))
}

/// Create a remote product.
#[instrument(skip_all, fields(admin = %admin.uid))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>)> {
    let (draft, image) = read_product_form(multipart).await?;
    let product = state.catalog().create_product(draft, image).await?;
    add_breadcrumb("admin", "Product created", &[("product_id", product.id.as_str())]);
    Ok((StatusCode::CREATED, Json(product)))
}

/// Edit a remote product. The image is only replaced when one is sent.
#[instrument(skip_all, fields(admin = %admin.uid, id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let id = ProductId::new(id);
    let (draft, image) = read_product_form(multipart).await?;
    let product = state.catalog().update_product(&id, draft, image).await?;
    add_breadcrumb("admin", "Product updated", &[("product_id", id.as_str())]);
    Ok(Json(product))
}

/// Delete a remote product.
#[instrument(skip_all, fields(admin = %admin.uid, id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = ProductId::new(id);
    state.catalog().delete_product(&id).await?;
    add_breadcrumb("admin", "Product deleted", &[("product_id", id.as_str())]);
    Ok(StatusCode::NO_CONTENT)
}

/// Every purchase by every user.
pub async fn purchases(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Purchase>>> {
    Ok(Json(state.checkout().all_purchases().await?))
}

/// Collect the product fields and optional image from a multipart body.
///
/// An `image` part with no bytes counts as no image.
async fn read_product_form(
    mut multipart: Multipart,
) -> Result<(ProductDraft, Option<ImageUpload>)> {
    let mut draft = ProductDraft::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "name" => draft.name = value,
            "price" => draft.price = value,
            "description" => draft.description = value,
            "category" => draft.category = value,
            _ => {}
        }
    }

    Ok((draft, image))
}
