//! Type-safe price representation using decimal arithmetic.
//!
//! Product prices arrive in several shapes: JSON numbers, plain strings
//! (`"100"`) and display strings with a currency symbol (`"$1,299.00"`).
//! [`Price::parse`] and [`Price::from_json`] turn all of them into one
//! canonical decimal amount.

use core::fmt;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount is above [`Price::MAX_AMOUNT`].
    #[error("price cannot exceed {}", Price::MAX_AMOUNT)]
    TooLarge,
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Largest accepted amount (one trillion).
    ///
    /// Keeps `MAX_AMOUNT * u32::MAX` and sums of many such lines well inside
    /// the range of [`Decimal`].
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a USD price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    /// A zero USD price.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(Decimal::ZERO, CurrencyCode::USD)
    }

    /// Parse a price from user or document input.
    ///
    /// Accepts an optional leading currency symbol, surrounding whitespace
    /// and `,` thousands separators. The currency is assumed to be USD.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, negative or
    /// above [`Price::MAX_AMOUNT`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let digits: String = trimmed
            .trim_start_matches(['$', '€', '£'])
            .chars()
            .filter(|c| *c != ',')
            .collect();

        let amount: Decimal = digits
            .trim()
            .parse()
            .map_err(|_| PriceError::Invalid(s.to_owned()))?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX_AMOUNT {
            return Err(PriceError::TooLarge);
        }

        Ok(Self::new(amount, CurrencyCode::USD))
    }

    /// Parse a price from a raw JSON value (number or string).
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither a number nor a parseable string.
    pub fn from_json(value: &Value) -> Result<Self, PriceError> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Self::parse(&n.to_string()),
            Value::Null => Err(PriceError::Empty),
            other => Err(PriceError::Invalid(other.to_string())),
        }
    }

    /// Amount minus `other`, floored at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        let amount = self.amount.saturating_sub(other.amount).max(Decimal::ZERO);
        Self::new(amount, self.currency_code)
    }

    /// The amount rounded to two decimal places, as a plain string.
    #[must_use]
    pub fn amount_string(&self) -> String {
        format!("{:.2}", self.amount.round_dp(2))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

// Saturating: amounts that bypassed `parse` must not panic a cart view.
impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount.saturating_add(rhs.amount), self.currency_code)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self::new(
            self.amount.saturating_mul(Decimal::from(rhs)),
            self.currency_code,
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.currency_code.symbol(), self.amount_string())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_plain_and_symbol_prices() {
        assert_eq!(Price::parse("100").unwrap(), Price::from_cents(10_000));
        assert_eq!(Price::parse("$100").unwrap(), Price::from_cents(10_000));
        assert_eq!(Price::parse(" $1,299.99 ").unwrap(), Price::from_cents(129_999));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Price::parse(""), Err(PriceError::Empty));
        assert!(matches!(Price::parse("free"), Err(PriceError::Invalid(_))));
        assert_eq!(Price::parse("-5"), Err(PriceError::Negative));
    }

    #[test]
    fn test_from_json_number_and_string() {
        assert_eq!(Price::from_json(&json!(49.5)).unwrap(), Price::from_cents(4_950));
        assert_eq!(Price::from_json(&json!("$49.50")).unwrap(), Price::from_cents(4_950));
        assert_eq!(Price::from_json(&json!(null)), Err(PriceError::Empty));
        assert!(Price::from_json(&json!([1])).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(30_000).to_string(), "$300.00");
        assert_eq!(Price::parse("9.5").unwrap().to_string(), "$9.50");
    }

    #[test]
    fn test_parse_ceiling() {
        assert_eq!(Price::MAX_AMOUNT, Decimal::new(1_000_000_000_000, 0));
        assert!(Price::parse("1000000000000").is_ok());
        assert!(Price::parse("$1,000,000,000,000.00").is_ok());
        assert_eq!(Price::parse("1000000000000.01"), Err(PriceError::TooLarge));
        assert_eq!(
            Price::parse("100000000000000000000"),
            Err(PriceError::TooLarge)
        );
    }

    #[test]
    fn test_largest_line_total_fits() {
        let ceiling = Price::new(Price::MAX_AMOUNT, CurrencyCode::USD);
        let line = ceiling * u32::MAX;
        assert_eq!(line.amount, Price::MAX_AMOUNT * Decimal::from(u32::MAX));
        assert_eq!((line + line).amount, line.amount * Decimal::TWO);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Price::new(Decimal::MAX, CurrencyCode::USD);
        assert_eq!((huge * u32::MAX).amount, Decimal::MAX);
        assert_eq!((huge + huge).amount, Decimal::MAX);
    }

    #[test]
    fn test_arithmetic() {
        let line = Price::parse("100").unwrap() * 3;
        assert_eq!(line, Price::from_cents(30_000));
        assert_eq!(line + Price::from_cents(50), Price::from_cents(30_050));
        assert_eq!(
            Price::from_cents(500).saturating_sub(Price::from_cents(1_000)),
            Price::zero()
        );
    }
}
