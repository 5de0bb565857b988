//! # Pricing Module
//!
//! The tiered quantity discount rule.
//!
//! ## Discount Schedule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  quantity        tier             discount                              │
//! │  ─────────────   ──────────────   ───────────────────────────────────   │
//! │  1 ..= 3         None             0                                     │
//! │  4 ..= 9         TenPercent       quantity × unit price × 0.10         │
//! │  10 ..= 20       TwentyPercent    quantity × unit price × 0.20         │
//! │  > 20            (rejected)       CoreError::QuantityTooLarge          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Arithmetic is checked. A figure outside the `Decimal` range comes back as
//! `CoreError::AmountOverflow`.
//!
//! The same figures are served to the browser by the pricing preview
//! endpoint, so a preview can never disagree with a saved sale.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, TEN_PERCENT_MIN_QUANTITY, TWENTY_PERCENT_MIN_QUANTITY};

// =============================================================================
// Discount Tier
// =============================================================================

/// Which step of the discount schedule a quantity falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum DiscountTier {
    None,
    TenPercent,
    TwentyPercent,
}

impl DiscountTier {
    /// Picks the tier for a quantity.
    ///
    /// ## Errors
    /// `CoreError::QuantityTooLarge` when `quantity > 20`. Quantities are
    /// never clamped into the top tier.
    pub fn for_quantity(quantity: i64) -> CoreResult<Self> {
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        Ok(if quantity >= TWENTY_PERCENT_MIN_QUANTITY {
            DiscountTier::TwentyPercent
        } else if quantity >= TEN_PERCENT_MIN_QUANTITY {
            DiscountTier::TenPercent
        } else {
            DiscountTier::None
        })
    }

    /// The tier's rate as an exact fraction.
    pub fn rate(&self) -> Decimal {
        match self {
            DiscountTier::None => Decimal::ZERO,
            DiscountTier::TenPercent => Decimal::new(10, 2),
            DiscountTier::TwentyPercent => Decimal::new(20, 2),
        }
    }
}

// =============================================================================
// Discount Rule
// =============================================================================

/// Computes the discount for one product line.
///
/// Pure: no side effects, same input gives the same output.
///
/// ## Example
/// ```rust
/// use saledesk_core::money::Money;
/// use saledesk_core::pricing::compute_discount;
///
/// assert_eq!(compute_discount(5, Money::from_major(50)).unwrap(), Money::from_major(25));
/// assert_eq!(compute_discount(2, Money::from_major(30)).unwrap(), Money::zero());
/// assert!(compute_discount(21, Money::from_major(10)).is_err());
/// ```
pub fn compute_discount(quantity: i64, unit_price: Money) -> CoreResult<Money> {
    let tier = DiscountTier::for_quantity(quantity)?;
    unit_price.multiply_quantity(quantity)?.percent_of(tier.rate())
}

// =============================================================================
// Priced Line
// =============================================================================

/// Every figure for one priced line, as shown in a preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricedLine {
    pub quantity: i64,
    pub unit_price: Money,
    pub tier: DiscountTier,
    pub gross: Money,
    pub discount: Money,
    pub total: Money,
}

/// Prices a line without creating an item.
pub fn price_line(quantity: i64, unit_price: Money) -> CoreResult<PricedLine> {
    let tier = DiscountTier::for_quantity(quantity)?;
    let gross = unit_price.multiply_quantity(quantity)?;
    let discount = gross.percent_of(tier.rate())?;
    let total = gross.checked_sub(discount)?;

    Ok(PricedLine {
        quantity,
        unit_price,
        tier,
        gross,
        discount,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
