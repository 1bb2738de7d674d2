//! Value objects shared across the storefront.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Currency amount with two fractional digits, persisted as integer cents.
///
/// Currency-unit agnostic: the storefront runs in a single currency and
/// never mixes units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp(2))
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Integer-cents form for storage. Amounts are normalized to two decimal
    /// places on construction, so this never truncates; amounts beyond the
    /// i64 cents range clamp to the nearest bound.
    pub fn cents(&self) -> i64 {
        let cents = self.0.saturating_mul(Decimal::ONE_HUNDRED);
        cents.to_i64().unwrap_or(if cents.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn times(&self, qty: i64) -> Money {
        Money(self.0.saturating_mul(Decimal::from(qty)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Stock keeping unit. Stored as entered; uniqueness is case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::Validation("SKU must not be empty".into()));
        }
        if value.len() > 40 {
            return Err(Error::Validation("SKU must be at most 40 characters".into()));
        }
        Ok(Self(value.to_string()))
    }

    /// For rows already validated by the database schema.
    pub(crate) fn from_trusted(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_cents_round_trip() {
        let m = Money::from_cents(19_999);
        assert_eq!(m.cents(), 19_999);
        assert_eq!(m.to_string(), "199.99");
    }

    #[test]
    fn money_arithmetic() {
        let unit = Money::from_cents(3_000);
        assert_eq!(unit.times(3).cents(), 9_000);
        assert_eq!((unit + Money::from_cents(500)).cents(), 3_500);
        let total: Money = [unit, unit].into_iter().sum();
        assert_eq!(total.cents(), 6_000);
    }

    #[test]
    fn money_normalizes_scale() {
        // round_dp uses midpoint-nearest-even
        let m = Money::new("10.005".parse().unwrap());
        assert_eq!(m.cents(), 1_000);
    }

    #[test]
    fn money_out_of_range_clamps_instead_of_zeroing() {
        assert_eq!(Money::new(Decimal::MAX).cents(), i64::MAX);
        let huge = Money::from_cents(i64::MAX).times(i64::MAX);
        assert_eq!(huge.cents(), i64::MAX);
        let debt = Money::from_cents(i64::MIN).times(i64::MAX);
        assert_eq!(debt.cents(), i64::MIN);
    }

    #[test]
    fn sku_trims() {
        let sku = Sku::parse("  epo-sm-001  ").unwrap();
        assert_eq!(sku.as_str(), "epo-sm-001");
    }

    #[test]
    fn sku_rejects_empty_and_long() {
        assert!(Sku::parse("   ").is_err());
        assert!(Sku::parse(&"x".repeat(41)).is_err());
    }
}
