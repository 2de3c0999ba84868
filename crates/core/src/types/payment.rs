//! Payment methods offered at checkout.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How the customer chose to pay.
///
/// Serialized in camelCase (`creditCard`, `paypal`, `bankTransfer`), which is
/// also the value written to purchase records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    Paypal,
    BankTransfer,
}

impl PaymentMethod {
    /// Value stored in purchase records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "creditCard",
            Self::Paypal => "paypal",
            Self::BankTransfer => "bankTransfer",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CreditCard => "Credit/Debit Card",
            Self::Paypal => "PayPal",
            Self::BankTransfer => "Bank Transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
