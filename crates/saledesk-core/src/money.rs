//! # Money Module
//!
//! Exact decimal amounts for prices, discounts and totals.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Binary floats drift:                                                   │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  With integer cents, percentages still leak:                            │
//! │    4 × $0.03 × 10% = 1.2 cents      → rounding decision needed         │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal                                          │
//! │    4 × 0.03 × 0.10 = 0.012          exact, no rounding at all          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use saledesk_core::money::Money;
//!
//! let price: Money = "25.50".parse().unwrap();
//! let line = price.multiply_quantity(4).unwrap();
//! assert_eq!(line, Money::from_major(102));
//!
//! // NEVER do this:
//! // let bad = Money::from_f64(25.5); // NO SUCH METHOD EXISTS!
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the major currency unit, held as an exact decimal.
///
/// ## Design Decisions
/// - **Decimal, not f64**: prices and percentage discounts stay exact
/// - **Scale is preserved**: `200.00` and `200` compare equal
/// - **Serialized as a string**: JSON numbers would lose the guarantee
///   on the way through JavaScript
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  SaleItem.unit_price ──► × quantity ──► − discount ──► SaleItem.total   │
/// │                                                            │            │
/// │                                    Σ over items ◄──────────┘            │
/// │                                         │                               │
/// │                                         ▼                               │
/// │                                  Sale.total_amount                      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a whole-unit amount.
    ///
    /// ## Example
    /// ```rust
    /// use saledesk_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(100).to_string(), "100");
    /// ```
    #[inline]
    pub fn from_major(major: i64) -> Self {
        Money(Decimal::from(major))
    }

    /// Creates an amount from minor units (cents).
    ///
    /// ## Example
    /// ```rust
    /// use saledesk_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// `true` for any zero, whatever its scale.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly above zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Strictly below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Line subtotal: unit price times quantity.
    ///
    /// ## Errors
    /// `CoreError::AmountOverflow` when the product leaves the `Decimal` range.
    ///
    /// ## Example
    /// ```rust
    /// use saledesk_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).unwrap(), Money::from_cents(897));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> CoreResult<Self> {
        self.0
            .checked_mul(Decimal::from(qty))
            .map(Money)
            .ok_or(CoreError::AmountOverflow("line subtotal"))
    }

    /// Takes an exact fraction of this amount.
    ///
    /// `rate` is a plain fraction: `0.10` is ten percent. No rounding is
    /// applied, so `percent_of` never loses a fractional cent.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use saledesk_core::money::Money;
    ///
    /// let line = Money::from_cents(12); // 4 × 0.03
    /// let discount = line.percent_of(Decimal::new(10, 2)).unwrap();
    /// assert_eq!(discount.to_string(), "0.0120");
    /// ```
    #[inline]
    pub fn percent_of(&self, rate: Decimal) -> CoreResult<Self> {
        self.0
            .checked_mul(rate)
            .map(Money)
            .ok_or(CoreError::AmountOverflow("discount"))
    }

    /// [`Money::multiply_quantity`] clamped to the `Decimal` range, for
    /// figures derived from an already priced item.
    #[inline]
    pub fn saturating_multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(Decimal::from(qty)))
    }

    /// Addition that reports overflow instead of saturating.
    #[inline]
    pub fn checked_add(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(CoreError::AmountOverflow("sum"))
    }

    /// Subtraction that reports overflow instead of saturating.
    #[inline]
    pub fn checked_sub(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(CoreError::AmountOverflow("difference"))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the exact decimal, scale included.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// The operators saturate at the `Decimal` range. Pricing goes through the
// checked methods, so a priced sale never reaches the bounds here.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
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
// Unit Tests
// =============================================================================
