//! # Money Module
//!
//! Provides the `Money` type for every monetary column in the system:
//! sell/cost prices, invoice totals, payments, shift cash and customer
//! balances.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Invoice: 3 × 33.33 + shipping 0.01                                     │
//! │                                                                         │
//! │  Floating point:  99.99000000000001  ❌ totals drift between recomputes│
//! │  Integer cents:   9999 + 1 = 10000   ✅ recomputation is exact         │
//! │                                                                         │
//! │  Totals are recomputed from line items on every change, so the sum    │
//! │  must be bit-for-bit identical no matter how often it runs.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vendorya_core::money::Money;
//!
//! let price = Money::from_major_minor(50, 0);              // 50.00
//! let line = price.checked_multiply_quantity(2).unwrap();  // 100.00
//! assert_eq!(line.cents(), 10_000);
//! assert_eq!(line.to_string(), "100.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (piastres, cents, ...).
///
/// Signed: negative values represent refunds, credit balances and cash
/// shortfalls at shift close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use vendorya_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    ///
    /// ```rust
    /// use vendorya_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(50, 0).cents(), 5000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value in major units as a float.
    ///
    /// Only for JSON fields that promise a plain number (see
    /// [`major_units`]). Never feed this back into arithmetic.
    #[inline]
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax on this amount, rounding half away from zero.
    ///
    /// Integer formula: `(amount * bps ± 5000) / 10000`.
    ///
    /// ```rust
    /// use vendorya_core::money::Money;
    /// use vendorya_core::types::TaxRate;
    ///
    /// let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(1400));
    /// assert_eq!(tax.cents(), 140); // 14% VAT on 10.00
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money::from_cents(rounded as i64)
    }

    /// Multiplies money by a whole quantity. `None` on overflow.
    ///
    /// ```rust
    /// use vendorya_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(5_000).checked_multiply_quantity(2), Some(Money::from_cents(10_000)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2 + 1).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, `None` as soon as the running total overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Wire Format
// =============================================================================

/// Serde adapter for fields clients read in major units (`100.0`, not
/// `10000`). Values stay in cents everywhere else.
///
/// ```rust
/// use serde::Serialize;
/// use vendorya_core::money::Money;
///
/// #[derive(Serialize)]
/// struct Receipt {
///     #[serde(with = "vendorya_core::money::major_units")]
///     total: Money,
/// }
///
/// let json = serde_json::to_string(&Receipt { total: Money::from_cents(10_000) }).unwrap();
/// assert_eq!(json, r#"{"total":100.0}"#);
/// ```
pub mod major_units {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Money;

    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.to_major_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let major = f64::deserialize(deserializer)?;
        let cents = (major * 100.0).round();
        if !cents.is_finite() || cents.abs() > i64::MAX as f64 {
            return Err(serde::de::Error::custom("amount out of range"));
        }
        Ok(Money::from_cents(cents as i64))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
