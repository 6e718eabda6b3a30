//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are kept as [`Decimal`] in memory so that cart totals add up
//! exactly, and are written to the store as plain JSON numbers. Older
//! records may hold the raw form string (e.g. `"9.99"`), so both numbers and
//! numeric strings are accepted when reading.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors that can occur when parsing a [`Price`] from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price is not a number: {0}")]
    Invalid(String),
    /// The input is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative amount in the store's single currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Parse a price typed into a form field.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` if the input is not a number, and
    /// `PriceError::Negative` if it is below zero.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let trimmed = input.trim();
        let amount = Decimal::from_str(trimmed)
            .map_err(|_| PriceError::Invalid(trimmed.to_owned()))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount.normalize()))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the price is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0.round_dp(2))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract().is_zero()
            && let Some(whole) = self.0.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        let amount = self
            .0
            .to_f64()
            .ok_or_else(|| serde::ser::Error::custom("price out of range"))?;
        serializer.serialize_f64(amount)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(|amount| Self(amount.normalize()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_input() {
        assert_eq!(Price::parse(" 9.99 ").unwrap(), Price::from_cents(999));
        assert_eq!(Price::parse("0").unwrap(), Price::ZERO);
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
        assert!(matches!(Price::parse("abc"), Err(PriceError::Invalid(_))));
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_cents(999).to_string(), "$9.99");
        assert_eq!(Price::parse("5").unwrap().to_string(), "$5.00");
        assert_eq!(Price::parse("0.1").unwrap().to_string(), "$0.10");
    }

    #[test]
    fn test_sum_is_exact() {
        let prices = [Price::parse("0.1").unwrap(), Price::parse("0.2").unwrap()];
        let total: Price = prices.iter().sum();
        assert_eq!(total, Price::parse("0.3").unwrap());
    }

    #[test]
    fn test_serializes_as_json_number() {
        assert_eq!(
            serde_json::to_value(Price::from_cents(999)).unwrap(),
            serde_json::json!(9.99)
        );
        assert_eq!(
            serde_json::to_value(Price::parse("12").unwrap()).unwrap(),
            serde_json::json!(12)
        );
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let from_number: Price = serde_json::from_str("9.99").unwrap();
        let from_string: Price = serde_json::from_str("\"9.99\"").unwrap();
        let from_int: Price = serde_json::from_str("3").unwrap();
        assert_eq!(from_number, Price::from_cents(999));
        assert_eq!(from_string, Price::from_cents(999));
        assert_eq!(from_int, Price::from_cents(300));
    }
}
