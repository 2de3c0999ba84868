//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use nuel_store_core::PaymentMethod;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{CurrentSession, RequireAuth, SessionCart};
use crate::models::session_keys;
use crate::services::checkout::{CardDetails, PaymentDetails, Receipt};
use crate::state::AppState;

/// Payment form submitted at checkout.
///
/// Card fields are only read for `creditCard`.
#[derive(Deserialize)]
pub struct CheckoutForm {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
}

impl CheckoutForm {
    fn into_details(self) -> PaymentDetails {
        match self.payment_method {
            PaymentMethod::CreditCard => PaymentDetails::CreditCard(CardDetails {
                number: SecretString::from(self.card_number),
                expiry: self.expiry,
                cvv: SecretString::from(self.cvv),
            }),
            PaymentMethod::Paypal => PaymentDetails::Paypal,
            PaymentMethod::BankTransfer => PaymentDetails::BankTransfer,
        }
    }
}

/// Receipt page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/receipt.html")]
pub struct ReceiptTemplate {
    pub receipt: Receipt,
}

/// Record the session cart as purchases.
///
/// The receipt is kept in the session for `GET /checkout/receipt`.
#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    SessionCart(cart): SessionCart,
    session: Session,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<Receipt>> {
    add_breadcrumb(
        "checkout",
        "Checkout submitted",
        &[("payment_method", form.payment_method.as_str())],
    );
    let payment = form.into_details();
    let receipt = state.checkout().checkout(&cart, &current, &payment).await?;

    session.insert(session_keys::LAST_RECEIPT, &receipt).await?;
    Ok(Json(receipt))
}

/// Render the receipt of this session's last checkout.
pub async fn receipt(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<ReceiptTemplate> {
    let receipt: Receipt = session
        .get(session_keys::LAST_RECEIPT)
        .await?
        .ok_or_else(|| AppError::NotFound("no recent checkout".to_string()))?;
    if receipt.purchaser != user.email {
        return Err(AppError::NotFound("no recent checkout".to_string()));
    }
    Ok(ReceiptTemplate { receipt })
}
