//! Precision-safe decimal types for conditional order accounting.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in settlement calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Relative price between two assets, with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with amounts in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Absolute basis-point deviation from another price.
    ///
    /// Returns None if `other` is zero.
    #[inline]
    pub fn deviation_bps(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0).abs() / other.0 * Decimal::from(BPS_DENOMINATOR))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Asset amount in base units, with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Saturating subtraction: never goes below zero.
    #[inline]
    pub fn saturating_sub(&self, rhs: Amount) -> Amount {
        if rhs.0 >= self.0 {
            Amount::ZERO
        } else {
            Amount(self.0 - rhs.0)
        }
    }

    /// Take the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Amount) -> Amount {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Scale this amount by a basis-point fraction (e.g. 2_500 bps = 25%).
    #[inline]
    pub fn mul_bps(&self, bps: u32) -> Amount {
        Amount(self.0 * Decimal::from(bps) / Decimal::from(BPS_DENOMINATOR))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Amount {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Amount {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Amount {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_deviation_bps() {
        let last = Price::new(dec!(100));
        let moved = Price::new(dec!(101));
        // 1% move = 100 bps, symmetric in sign
        assert_eq!(moved.deviation_bps(last).unwrap(), dec!(100));
        let dropped = Price::new(dec!(99));
        assert_eq!(dropped.deviation_bps(last).unwrap(), dec!(100));
    }

    #[test]
    fn test_price_deviation_from_zero_is_none() {
        assert!(Price::new(dec!(1)).deviation_bps(Price::ZERO).is_none());
    }

    #[test]
    fn test_amount_mul_bps() {
        let total = Amount::new(dec!(200));
        assert_eq!(total.mul_bps(2_500).inner(), dec!(50)); // 25%
        assert_eq!(total.mul_bps(BPS_DENOMINATOR).inner(), dec!(200)); // 100%
    }

    #[test]
    fn test_amount_saturating_sub() {
        let a = Amount::new(dec!(5));
        let b = Amount::new(dec!(8));
        assert_eq!(a.saturating_sub(b), Amount::ZERO);
        assert_eq!(b.saturating_sub(a).inner(), dec!(3));
    }

    #[test]
    fn test_amount_min() {
        let a = Amount::new(dec!(5));
        let b = Amount::new(dec!(8));
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }
}
