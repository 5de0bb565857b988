//! # Domain Types
//!
//! Core domain types used throughout Saledesk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐ 1     * ┌─────────────────┐                        │
//! │  │      Sale       │────────►│    SaleItem     │                        │
//! │  │  ─────────────  │         │  ─────────────  │                        │
//! │  │  id (UUID)      │         │  id (UUID)      │                        │
//! │  │  sale_number    │         │  sale_id (FK)   │                        │
//! │  │  sale_date      │         │  product_name   │                        │
//! │  │  customer       │         │  quantity       │                        │
//! │  │  branch         │         │  unit_price     │                        │
//! │  │  is_cancelled   │         │  discount       │                        │
//! │  └─────────────────┘         │  is_cancelled   │                        │
//! │                              └─────────────────┘                        │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │   OutboxEntry   │  Lifecycle event waiting for (or past) delivery   │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every sale has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `sale_number`: assigned by the operator, human-readable
//!
//! Totals are never stored on these types. They are derived from item
//! state every time they are read (see [`crate::sale`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Sale Item
// =============================================================================

/// One product line within a sale.
///
/// `discount` is written only by the discount pass. Everything else is
/// operator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub is_cancelled: bool,
}

impl SaleItem {
    /// Creates an undiscounted, active item with a fresh ID.
    pub fn new(
        sale_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
            discount: Money::zero(),
            is_cancelled: false,
        }
    }

    /// Quantity × unit price, before discount.
    ///
    /// The discount pass has already checked this product for any item of
    /// a priced sale.
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price.saturating_multiply_quantity(self.quantity)
    }

    /// Line total: quantity × unit price − discount.
    #[inline]
    pub fn total(&self) -> Money {
        self.gross() - self.discount
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sales transaction and its items.
///
/// Items keep insertion order. Order has no effect on pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub sale_number: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub customer: String,
    pub branch: String,
    pub is_cancelled: bool,
    pub items: Vec<SaleItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Creates an empty, active sale with a fresh ID.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use saledesk_core::{Money, Sale};
    ///
    /// let now = Utc::now();
    /// let mut sale = Sale::new("S-0001", now, "Acme Ltd", "Downtown", now);
    /// sale.add_item("Keyboard", 2, Money::from_major(30));
    /// assert_eq!(sale.items.len(), 1);
    /// assert_eq!(sale.items[0].sale_id, sale.id);
    /// ```
    pub fn new(
        sale_number: impl Into<String>,
        sale_date: DateTime<Utc>,
        customer: impl Into<String>,
        branch: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Sale {
            id: Uuid::new_v4().to_string(),
            sale_number: sale_number.into(),
            sale_date,
            customer: customer.into(),
            branch: branch.into(),
            is_cancelled: false,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends an item owned by this sale and returns it.
    ///
    /// The item is undiscounted until the next discount pass.
    pub fn add_item(
        &mut self,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> &mut SaleItem {
        let item = SaleItem::new(self.id.clone(), product_name, quantity, unit_price);
        self.items.push(item);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Looks up an item by ID.
    pub fn item(&self, item_id: &str) -> Option<&SaleItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

// =============================================================================
// Outbox Entry
// =============================================================================

/// A lifecycle event recorded alongside the write that produced it.
///
/// `published_at` stays `None` until a relay delivers it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OutboxEntry {
    pub id: String,
    pub topic: String,
    pub aggregate_id: String,
    /// JSON-encoded [`crate::SaleEvent`].
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Whether the relay has delivered this entry.
    #[inline]
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_total_subtracts_discount() {
        let mut item = SaleItem::new("sale-1", "Monitor", 10, Money::from_major(100));
        assert_eq!(item.gross(), Money::from_major(1000));
        assert_eq!(item.total(), Money::from_major(1000));

        item.discount = Money::from_major(200);
        assert_eq!(item.total(), Money::from_major(800));
    }

    #[test]
    fn test_add_item_links_to_sale() {
        let now = Utc::now();
        let mut sale = Sale::new("S-1", now, "Jane", "North", now);
        let item_id = sale.add_item("Cable", 3, Money::from_cents(499)).id.clone();

        let item = sale.item(&item_id).unwrap();
        assert_eq!(item.sale_id, sale.id);
        assert!(!item.is_cancelled);
        assert!(item.discount.is_zero());
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = SaleItem::new("s", "A", 1, Money::from_major(1));
        let b = SaleItem::new("s", "A", 1, Money::from_major(1));
        assert_ne!(a.id, b.id);
    }
}
