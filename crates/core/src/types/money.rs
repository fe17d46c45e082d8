//! Monetary amounts as returned by the commerce API.
//!
//! The API serializes decimal amounts as strings to preserve precision;
//! `Money` keeps that representation and exposes checked decimal access for
//! the few places that do arithmetic (cost consistency checks).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a monetary amount.
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("invalid decimal amount {amount:?}: {source}")]
    InvalidAmount {
        amount: String,
        source: rust_decimal::Error,
    },
}

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Decimal amount as string (preserves precision).
    pub amount: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    /// Create a money value from its string representation.
    #[must_use]
    pub fn new(amount: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency_code: currency_code.into(),
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency_code: impl Into<String>) -> Self {
        Self::new("0.0", currency_code)
    }

    /// Parse the amount as a decimal.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount string is not a valid decimal.
    pub fn decimal(&self) -> Result<Decimal, MoneyError> {
        self.amount
            .parse::<Decimal>()
            .map_err(|source| MoneyError::InvalidAmount {
                amount: self.amount.clone(),
                source,
            })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_decimal_parses_api_amounts() {
        let money = Money::new("19.99", "USD");
        assert_eq!(money.decimal().unwrap(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        let money = Money::new("not-a-number", "USD");
        assert!(money.decimal().is_err());
    }

    #[test]
    fn test_zero() {
        let money = Money::zero("EUR");
        assert_eq!(money.decimal().unwrap(), Decimal::ZERO);
        assert_eq!(money.currency_code, "EUR");
    }

    #[test]
    fn test_camel_case_wire_format() {
        let money: Money =
            serde_json::from_str(r#"{"amount":"42.50","currencyCode":"USD"}"#).unwrap();
        assert_eq!(money.amount, "42.50");
        assert_eq!(money.currency_code, "USD");
    }
}
