//! # saledesk-core: Pure Business Logic for Saledesk
//!
//! This crate is the **heart** of Saledesk. It prices sale items, derives
//! sale totals, and decides how an update merges into an existing sale.
//! None of it touches a database or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Saledesk Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/api)                          │   │
//! │  │    POST /api/sales ──► PUT /api/sales/{id} ──► DELETE ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ saledesk-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │   sale    │  │  events   │  │   │
//! │  │   │   Sale    │  │ discount  │  │  merge    │  │ SaleEvent │  │   │
//! │  │   │ SaleItem  │  │   tiers   │  │  totals   │  │  topics   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  saledesk-db (Database Layer)                   │   │
//! │  │            SQLite queries, migrations, event outbox             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, SaleItem, outbox entries)
//! - [`money`] - Money type over an exact decimal (no floating point!)
//! - [`pricing`] - The tiered quantity discount rule
//! - [`sale`] - Discount pass, totals, and the merge-update policy
//! - [`events`] - Sale lifecycle events and their topics
//! - [`error`] - Domain error types
//! - [`validation`] - Request field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use saledesk_core::money::Money;
//! use saledesk_core::pricing::compute_discount;
//!
//! let price = Money::from_major(100);
//! let discount = compute_discount(10, price).unwrap();
//!
//! // 10 × 100 at the 20% tier
//! assert_eq!(discount, Money::from_major(200));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod events;
pub mod money;
pub mod pricing;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationErrors};
pub use events::SaleEvent;
pub use money::Money;
pub use pricing::{compute_discount, price_line, DiscountTier, PricedLine};
pub use sale::{CancelledItem, ItemUpdate, MergeOutcome, SaleUpdate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product within one sale.
///
/// ## Business Reason
/// Identical items are capped per sale. Asking for more is rejected,
/// never clamped.
pub const MAX_ITEM_QUANTITY: i64 = 20;

/// Largest accepted unit price, in whole currency units.
///
/// Keeps every priced figure far inside the `Decimal` range:
/// 20 units at this price is 2×10^10, against a range of about 7.9×10^28.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000;

/// Quantity at which the 10% tier starts.
pub const TEN_PERCENT_MIN_QUANTITY: i64 = 4;

/// Quantity at which the 20% tier starts.
pub const TWENTY_PERCENT_MIN_QUANTITY: i64 = 10;

/// Reason recorded on a `SaleCancelled` event when the caller gives none.
pub const DEFAULT_CANCELLATION_REASON: &str = "Cancelled by operator";
