//! # Sale Lifecycle Events
//!
//! Notifications emitted for downstream systems when sales change.
//!
//! ## Which Write Emits What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create ──► SaleCreated      topic "sale-created"                       │
//! │                                                                         │
//! │  update ──► SaleModified     topic "sales-modified"   (always)          │
//! │        ├──► SaleCancelled    topic "sales-cancelled"  (sale flipped)    │
//! │        └──► ItemCancelled    topic "items-cancelled"  (per item flip)   │
//! │                                                                         │
//! │  delete ──► (nothing)                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are built here but never sent from here. The database layer
//! stores them in the outbox in the same transaction as the sale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::sale::{CancelledItem, MergeOutcome};
use crate::types::Sale;

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleCreated {
    pub sale_id: String,
    pub customer: String,
    pub total_amount: Money,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleModified {
    pub sale_id: String,
    #[ts(as = "String")]
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleCancelled {
    pub sale_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemCancelled {
    pub item_id: String,
    pub sale_id: String,
    pub product_name: String,
}

// =============================================================================
// Event Envelope
// =============================================================================

/// Any lifecycle event, tagged by kind when serialized.
///
/// ```json
/// { "event": "SaleModified", "saleId": "…", "modifiedAt": "…" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SaleEvent {
    SaleCreated(SaleCreated),
    SaleModified(SaleModified),
    SaleCancelled(SaleCancelled),
    ItemCancelled(ItemCancelled),
}

impl SaleEvent {
    pub const SALE_CREATED_TOPIC: &'static str = "sale-created";
    pub const SALE_MODIFIED_TOPIC: &'static str = "sales-modified";
    pub const SALE_CANCELLED_TOPIC: &'static str = "sales-cancelled";
    pub const ITEM_CANCELLED_TOPIC: &'static str = "items-cancelled";

    /// `SaleCreated` for a freshly priced sale.
    pub fn created(sale: &Sale) -> Self {
        SaleEvent::SaleCreated(SaleCreated {
            sale_id: sale.id.clone(),
            customer: sale.customer.clone(),
            total_amount: sale.total_amount(),
            sale_date: sale.sale_date,
        })
    }

    /// Every event one merge update produces, in emission order.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use saledesk_core::{MergeOutcome, Sale, SaleEvent};
    ///
    /// let now = Utc::now();
    /// let sale = Sale::new("S-1", now, "Acme", "North", now);
    /// let outcome = MergeOutcome { sale_cancelled: true, ..Default::default() };
    ///
    /// let events = SaleEvent::for_update(&sale, &outcome, "Duplicate entry", now);
    /// assert_eq!(events.len(), 2);
    /// assert_eq!(events[1].topic(), "sales-cancelled");
    /// ```
    pub fn for_update(
        sale: &Sale,
        outcome: &MergeOutcome,
        reason: &str,
        modified_at: DateTime<Utc>,
    ) -> Vec<Self> {
        let mut events = Vec::with_capacity(2 + outcome.cancelled_items.len());

        events.push(SaleEvent::SaleModified(SaleModified {
            sale_id: sale.id.clone(),
            modified_at,
        }));

        if outcome.sale_cancelled {
            events.push(SaleEvent::SaleCancelled(SaleCancelled {
                sale_id: sale.id.clone(),
                reason: reason.to_string(),
            }));
        }

        events.extend(outcome.cancelled_items.iter().map(SaleEvent::item_cancelled));
        events
    }

    fn item_cancelled(item: &CancelledItem) -> Self {
        SaleEvent::ItemCancelled(ItemCancelled {
            item_id: item.item_id.clone(),
            sale_id: item.sale_id.clone(),
            product_name: item.product_name.clone(),
        })
    }

    /// Topic name downstream consumers subscribe to.
    pub fn topic(&self) -> &'static str {
        match self {
            SaleEvent::SaleCreated(_) => Self::SALE_CREATED_TOPIC,
            SaleEvent::SaleModified(_) => Self::SALE_MODIFIED_TOPIC,
            SaleEvent::SaleCancelled(_) => Self::SALE_CANCELLED_TOPIC,
            SaleEvent::ItemCancelled(_) => Self::ITEM_CANCELLED_TOPIC,
        }
    }

    /// ID of the sale this event is about.
    pub fn sale_id(&self) -> &str {
        match self {
            SaleEvent::SaleCreated(e) => &e.sale_id,
            SaleEvent::SaleModified(e) => &e.sale_id,
            SaleEvent::SaleCancelled(e) => &e.sale_id,
            SaleEvent::ItemCancelled(e) => &e.sale_id,
        }
    }

    /// Encodes the event for the outbox.
    pub fn to_payload(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::InvalidEvent(e.to_string()))
    }

    /// Decodes an outbox payload.
    pub fn from_payload(payload: &str) -> CoreResult<Self> {
        serde_json::from_str(payload).map_err(|e| CoreError::InvalidEvent(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sale() -> Sale {
        let now = Utc::now();
        let mut sale = Sale::new("S-9", now, "Acme", "North", now);
        sale.add_item("Monitor", 10, Money::from_major(100));
        sale.apply_discount_rules().unwrap();
        sale
    }

    #[test]
    fn test_created_carries_total() {
        let sale = sale();
        match SaleEvent::created(&sale) {
            SaleEvent::SaleCreated(e) => {
                assert_eq!(e.sale_id, sale.id);
                assert_eq!(e.customer, "Acme");
                assert_eq!(e.total_amount, Money::from_major(800));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_update_without_transitions_emits_only_modified() {
        let sale = sale();
        let events = SaleEvent::for_update(&sale, &MergeOutcome::default(), "n/a", Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic(), SaleEvent::SALE_MODIFIED_TOPIC);
    }

    #[test]
    fn test_update_emits_one_event_per_cancelled_item() {
        let sale = sale();
        let outcome = MergeOutcome {
            cancelled_items: vec![
                CancelledItem {
                    item_id: "i-1".to_string(),
                    sale_id: sale.id.clone(),
                    product_name: "Monitor".to_string(),
                },
                CancelledItem {
                    item_id: "i-2".to_string(),
                    sale_id: sale.id.clone(),
                    product_name: "Mouse".to_string(),
                },
            ],
            sale_cancelled: false,
            inserted_item_ids: Vec::new(),
        };

        let topics: Vec<_> = SaleEvent::for_update(&sale, &outcome, "n/a", Utc::now())
            .iter()
            .map(SaleEvent::topic)
            .collect();
        assert_eq!(topics, vec!["sales-modified", "items-cancelled", "items-cancelled"]);
    }

    #[test]
    fn test_payload_is_tagged_camel_case() {
        let event = SaleEvent::SaleCancelled(SaleCancelled {
            sale_id: "abc".to_string(),
            reason: "Customer changed mind".to_string(),
        });

        let payload = event.to_payload().unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["event"], "SaleCancelled");
        assert_eq!(json["saleId"], "abc");

        assert_eq!(SaleEvent::from_payload(&payload).unwrap(), event);
        assert_eq!(event.sale_id(), "abc");
    }

    #[test]
    fn test_garbage_payload_is_an_error() {
        assert!(matches!(
            SaleEvent::from_payload("{not json"),
            Err(CoreError::InvalidEvent(_))
        ));
    }
}
