//! Money types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal for precise calculations without floating-point errors.
//! The system bills in a single currency, so `Money` carries no currency code;
//! the display label is a presentation concern.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use thiserror::Error;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// A monetary amount
///
/// Stored with 4 decimal places internally so that per-class rates
/// (a quarter of a period fee) never lose precision before display rounding.
/// Deserialized amounts go through [`Money::new`] and hold the same scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Creates a new Money value
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp(4))
    }

    /// Creates Money from a whole number of currency units
    pub fn from_major(units: i64) -> Self {
        Self(Decimal::new(units, 0))
    }

    /// Parses a user-entered amount such as `"1500"` or `"1500.50"`
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        input
            .trim()
            .parse::<Decimal>()
            .map(Self::new)
            .map_err(|_| MoneyError::InvalidAmount(input.to_string()))
    }

    /// Creates a zero amount
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is positive
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns the smaller of two amounts
    pub fn min(self, other: Money) -> Money {
        if self <= other { self } else { other }
    }

    /// Clamps negative amounts to zero
    pub fn floor_at_zero(self) -> Money {
        if self.is_negative() { Money::ZERO } else { self }
    }

    /// Rounds to the nearest whole unit, halves away from zero
    pub fn round_whole(&self) -> Self {
        Self(self.0.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Multiplies by a scalar (e.g., a class count)
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.0 * factor)
    }

    /// Divides by a scalar
    pub fn divide(&self, divisor: Decimal) -> Result<Self, MoneyError> {
        if divisor.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        Ok(Self::new(self.0 / divisor))
    }

    /// Returns the per-unit share of this amount when split into `units` equal parts
    pub fn per_unit(&self, units: u32) -> Result<Self, MoneyError> {
        self.divide(Decimal::from(units))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(100.50));
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_major(100);
        let b = Money::from_major(50);

        assert_eq!((a + b).amount(), dec!(150));
        assert_eq!((a - b).amount(), dec!(50));
        assert_eq!((b - a).amount(), dec!(-50));
    }

    #[test]
    fn test_floor_at_zero() {
        assert_eq!((Money::from_major(10) - Money::from_major(25)).floor_at_zero(), Money::ZERO);
        assert_eq!(Money::from_major(7).floor_at_zero(), Money::from_major(7));
    }

    #[test]
    fn test_round_whole_half_up() {
        assert_eq!(Money::new(dec!(1666.5)).round_whole(), Money::from_major(1667));
        assert_eq!(Money::new(dec!(1666.49)).round_whole(), Money::from_major(1666));
    }

    #[test]
    fn test_per_unit() {
        let fee = Money::from_major(2000);
        assert_eq!(fee.per_unit(4).unwrap(), Money::from_major(500));
        assert_eq!(Money::from_major(1500).per_unit(4).unwrap(), Money::from_major(375));
        assert_eq!(fee.per_unit(0), Err(MoneyError::DivisionByZero));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse(" 1500.50 ").unwrap().amount(), dec!(1500.50));
        assert!(matches!(Money::parse("abc"), Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(Money::from_major(2500).to_string(), "2500");
        assert_eq!(Money::new(dec!(12.50)).to_string(), "12.5");
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&Money::new(dec!(2000))).unwrap();
        assert_eq!(json, "\"2000\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Money::from_major(2000));
    }

    #[test]
    fn test_deserialize_rounds_to_four_places() {
        let money: Money = serde_json::from_str("\"100.00015\"").unwrap();
        assert_eq!(money, Money::new(dec!(100.00015)));
        assert_eq!(money.amount().scale(), 4);
    }
}
