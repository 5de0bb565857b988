//! # Sale Aggregation
//!
//! Discount pass, derived totals, and the merge-update policy for [`Sale`].
//!
//! ## Update Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       merge_update(update)                              │
//! │                                                                         │
//! │  1. DETECT (reads pre-merge state only)                                │
//! │     └── items flipping active → cancelled  ──► cancelled_items         │
//! │     └── sale flipping active → cancelled   ──► sale_cancelled          │
//! │                                                                         │
//! │  2. MERGE into a working copy                                          │
//! │     └── known id   → overwrite name / quantity / price                 │
//! │     └── unknown id → new item, fresh id                                │
//! │     └── not listed → untouched (never deleted)                         │
//! │                                                                         │
//! │  3. DISCOUNT PASS on the working copy                                  │
//! │     └── any item > 20 units → Err, `self` unchanged                    │
//! │                                                                         │
//! │  4. COMMIT working copy into `self`                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation flags only move one way. An incoming `isCancelled: false`
//! never re-activates an item or a sale.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::price_line;
use crate::types::{Sale, SaleItem};

// =============================================================================
// Update Inputs
// =============================================================================

/// Incoming state for one item of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    /// Matches an existing item when present and known.
    pub id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub is_cancelled: bool,
}

/// Incoming state for a whole sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleUpdate {
    pub sale_number: String,
    pub sale_date: DateTime<Utc>,
    pub customer: String,
    pub branch: String,
    pub is_cancelled: bool,
    pub items: Vec<ItemUpdate>,
}

// =============================================================================
// Update Outcome
// =============================================================================

/// An item that went from active to cancelled during a merge.
///
/// `product_name` is the name before the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledItem {
    pub item_id: String,
    pub sale_id: String,
    pub product_name: String,
}

/// What a merge changed, for the event layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// In existing-item order.
    pub cancelled_items: Vec<CancelledItem>,
    pub sale_cancelled: bool,
    pub inserted_item_ids: Vec<String>,
}

// =============================================================================
// Aggregation
// =============================================================================

impl Sale {
    /// Recomputes every item's discount.
    ///
    /// ## Atomicity
    /// All discounts are computed before any is written. If an item breaks
    /// the quantity cap the first violation is returned and no item changes.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use saledesk_core::{Money, Sale};
    ///
    /// let now = Utc::now();
    /// let mut sale = Sale::new("S-1", now, "Acme", "North", now);
    /// sale.add_item("Monitor", 10, Money::from_major(100));
    /// sale.add_item("Mouse", 5, Money::from_major(50));
    /// sale.apply_discount_rules().unwrap();
    ///
    /// assert_eq!(sale.total_amount(), Money::from_major(1025));
    /// ```
    pub fn apply_discount_rules(&mut self) -> CoreResult<()> {
        let lines = self
            .items
            .iter()
            .map(|item| {
                price_line(item.quantity, item.unit_price).map_err(|err| match err {
                    CoreError::QuantityTooLarge { max, .. } => CoreError::QuantityLimitExceeded {
                        product_name: item.product_name.clone(),
                        max,
                    },
                    other => other,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        // total_amount() must stay inside the Decimal range too
        lines
            .iter()
            .try_fold(Money::zero(), |sum, line| sum.checked_add(line.total))?;

        for (item, line) in self.items.iter_mut().zip(lines) {
            item.discount = line.discount;
        }

        Ok(())
    }

    /// Sum of every item's total, cancelled items included.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(SaleItem::total).sum()
    }

    /// Sum of the totals of items that are not cancelled.
    pub fn active_amount(&self) -> Money {
        self.items
            .iter()
            .filter(|item| !item.is_cancelled)
            .map(SaleItem::total)
            .sum()
    }

    /// Merges an update into this sale and re-prices it.
    ///
    /// On error `self` is left exactly as it was.
    pub fn merge_update(
        &mut self,
        update: SaleUpdate,
        now: DateTime<Utc>,
    ) -> CoreResult<MergeOutcome> {
        let cancelled_items = self.detect_item_cancellations(&update.items);
        let sale_cancelled = !self.is_cancelled && update.is_cancelled;

        let mut working = self.clone();
        working.sale_number = update.sale_number;
        working.sale_date = update.sale_date;
        working.customer = update.customer;
        working.branch = update.branch;
        working.is_cancelled = working.is_cancelled || update.is_cancelled;
        working.updated_at = now;

        let mut inserted_item_ids = Vec::new();
        for incoming in update.items {
            let position = incoming
                .id
                .as_deref()
                .and_then(|id| working.items.iter().position(|item| item.id == id));

            match position {
                Some(index) => {
                    let item = &mut working.items[index];
                    item.product_name = incoming.product_name;
                    item.quantity = incoming.quantity;
                    item.unit_price = incoming.unit_price;
                    item.is_cancelled = item.is_cancelled || incoming.is_cancelled;
                }
                None => {
                    let item = working.add_item(
                        incoming.product_name,
                        incoming.quantity,
                        incoming.unit_price,
                    );
                    item.is_cancelled = incoming.is_cancelled;
                    inserted_item_ids.push(item.id.clone());
                }
            }
        }

        working.apply_discount_rules()?;
        *self = working;

        Ok(MergeOutcome {
            cancelled_items,
            sale_cancelled,
            inserted_item_ids,
        })
    }

    fn detect_item_cancellations(&self, incoming: &[ItemUpdate]) -> Vec<CancelledItem> {
        self.items
            .iter()
            .filter(|existing| !existing.is_cancelled)
            .filter(|existing| {
                incoming
                    .iter()
                    .any(|i| i.is_cancelled && i.id.as_deref() == Some(existing.id.as_str()))
            })
            .map(|existing| CancelledItem {
                item_id: existing.id.clone(),
                sale_id: self.id.clone(),
                product_name: existing.product_name.clone(),
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_sale() -> Sale {
        let now = Utc::now();
        let mut sale = Sale::new("S-100", now - Duration::hours(1), "Acme", "North", now);
        sale.add_item("Monitor", 10, Money::from_major(100));
        sale.add_item("Mouse", 5, Money::from_major(50));
        sale.apply_discount_rules().unwrap();
        sale
    }

    fn update_from(sale: &Sale) -> SaleUpdate {
        SaleUpdate {
            sale_number: sale.sale_number.clone(),
            sale_date: sale.sale_date,
            customer: sale.customer.clone(),
            branch: sale.branch.clone(),
            is_cancelled: sale.is_cancelled,
            items: sale
                .items
                .iter()
                .map(|item| ItemUpdate {
                    id: Some(item.id.clone()),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    is_cancelled: item.is_cancelled,
                })
                .collect(),
        }
    }

    #[test]
    fn test_scenario_totals() {
        let sale = sample_sale();
        assert_eq!(sale.items[0].discount, Money::from_major(200));
        assert_eq!(sale.items[0].total(), Money::from_major(800));
        assert_eq!(sale.items[1].discount, Money::from_major(25));
        assert_eq!(sale.items[1].total(), Money::from_major(225));
        assert_eq!(sale.total_amount(), Money::from_major(1025));
    }

    #[test]
    fn test_empty_sale_totals_zero() {
        let now = Utc::now();
        let mut sale = Sale::new("S-0", now, "Acme", "North", now);
        sale.apply_discount_rules().unwrap();
        assert_eq!(sale.total_amount(), Money::zero());
        assert_eq!(sale.active_amount(), Money::zero());
    }

    #[test]
    fn test_discount_pass_is_idempotent() {
        let mut sale = sample_sale();
        let before = sale.clone();
        sale.apply_discount_rules().unwrap();
        assert_eq!(sale, before);
    }

    #[test]
    fn test_discount_pass_is_atomic() {
        let mut sale = sample_sale();
        sale.add_item("Cable", 21, Money::from_major(10));
        let before = sale.clone();

        let err = sale.apply_discount_rules().unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuantityLimitExceeded { ref product_name, max: 20 } if product_name == "Cable"
        ));
        assert_eq!(sale, before);
    }

    #[test]
    fn test_out_of_range_amounts_leave_sale_unchanged() {
        let huge = Money::new(rust_decimal::Decimal::MAX);

        let mut line_overflow = sample_sale();
        line_overflow.add_item("Vault", 2, huge);
        let before = line_overflow.clone();
        assert!(matches!(
            line_overflow.apply_discount_rules(),
            Err(CoreError::AmountOverflow(_))
        ));
        assert_eq!(line_overflow, before);

        // each line fits, their sum does not
        let mut sum_overflow = sample_sale();
        sum_overflow.add_item("Vault A", 1, huge);
        sum_overflow.add_item("Vault B", 1, huge);
        let before = sum_overflow.clone();
        assert!(matches!(
            sum_overflow.apply_discount_rules(),
            Err(CoreError::AmountOverflow("sum"))
        ));
        assert_eq!(sum_overflow, before);
    }

    #[test]
    fn test_cancelled_items_count_toward_total_only() {
        let mut sale = sample_sale();
        sale.items[1].is_cancelled = true;
        assert_eq!(sale.total_amount(), Money::from_major(1025));
        assert_eq!(sale.active_amount(), Money::from_major(800));
    }

    #[test]
    fn test_merge_leaves_unlisted_items_untouched() {
        let mut sale = sample_sale();
        let mouse = sale.items[1].clone();

        let mut update = update_from(&sale);
        update.items.truncate(1);
        update.items[0].quantity = 2;

        sale.merge_update(update, Utc::now()).unwrap();

        assert_eq!(sale.items.len(), 2);
        assert_eq!(sale.items[1], mouse);
        assert_eq!(sale.items[0].quantity, 2);
        assert_eq!(sale.items[0].discount, Money::zero());
    }

    #[test]
    fn test_merge_inserts_unknown_ids() {
        let mut sale = sample_sale();
        let mut update = update_from(&sale);
        update.items.push(ItemUpdate {
            id: Some("not-an-existing-id".to_string()),
            product_name: "Cable".to_string(),
            quantity: 2,
            unit_price: Money::from_major(30),
            is_cancelled: false,
        });

        let outcome = sale.merge_update(update, Utc::now()).unwrap();

        assert_eq!(sale.items.len(), 3);
        assert_eq!(outcome.inserted_item_ids.len(), 1);
        let inserted = sale.item(&outcome.inserted_item_ids[0]).unwrap();
        assert_ne!(inserted.id, "not-an-existing-id");
        assert_eq!(inserted.sale_id, sale.id);
        assert_eq!(inserted.total(), Money::from_major(60));
        assert_eq!(sale.total_amount(), Money::from_major(1085));
    }

    #[test]
    fn test_item_cancellation_reported_once() {
        let mut sale = sample_sale();
        let mut update = update_from(&sale);
        update.items[1].is_cancelled = true;

        let outcome = sale.merge_update(update.clone(), Utc::now()).unwrap();
        assert_eq!(outcome.cancelled_items.len(), 1);
        assert_eq!(outcome.cancelled_items[0].product_name, "Mouse");
        assert_eq!(outcome.cancelled_items[0].sale_id, sale.id);
        assert!(sale.items[1].is_cancelled);

        let again = sale.merge_update(update, Utc::now()).unwrap();
        assert!(again.cancelled_items.is_empty());
    }

    #[test]
    fn test_cancellation_cannot_be_reversed() {
        let mut sale = sample_sale();
        let mut update = update_from(&sale);
        update.is_cancelled = true;
        update.items[0].is_cancelled = true;
        let outcome = sale.merge_update(update, Utc::now()).unwrap();
        assert!(outcome.sale_cancelled);

        let mut reactivate = update_from(&sale);
        reactivate.is_cancelled = false;
        reactivate.items[0].is_cancelled = false;
        let outcome = sale.merge_update(reactivate, Utc::now()).unwrap();

        assert!(!outcome.sale_cancelled);
        assert!(sale.is_cancelled);
        assert!(sale.items[0].is_cancelled);
    }

    #[test]
    fn test_cancellation_reports_pre_merge_name() {
        let mut sale = sample_sale();
        let mut update = update_from(&sale);
        update.items[0].product_name = "Monitor 27\"".to_string();
        update.items[0].is_cancelled = true;

        let outcome = sale.merge_update(update, Utc::now()).unwrap();
        assert_eq!(outcome.cancelled_items[0].product_name, "Monitor");
        assert_eq!(sale.items[0].product_name, "Monitor 27\"");
    }

    #[test]
    fn test_failed_merge_leaves_sale_unchanged() {
        let mut sale = sample_sale();
        let before = sale.clone();

        let mut update = update_from(&sale);
        update.customer = "Someone Else".to_string();
        update.items[0].quantity = 21;

        assert!(sale.merge_update(update, Utc::now()).is_err());
        assert_eq!(sale, before);
    }

    #[test]
    fn test_merge_overwrites_header() {
        let mut sale = sample_sale();
        let later = Utc::now() + Duration::seconds(5);
        let mut update = update_from(&sale);
        update.customer = "Globex".to_string();
        update.branch = "South".to_string();

        sale.merge_update(update, later).unwrap();
        assert_eq!(sale.customer, "Globex");
        assert_eq!(sale.branch, "South");
        assert_eq!(sale.updated_at, later);
    }
}
