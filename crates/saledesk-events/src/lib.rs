//! # saledesk-events: Lifecycle Event Delivery
//!
//! Moves sale lifecycle events from the database outbox to the outside world.
//!
//! ## Delivery Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleService ──(same tx)──► event_outbox                                │
//! │       │                          │                                      │
//! │       └── RelayHandle::nudge ──► OutboxRelay ──► dyn EventPublisher     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is best-effort and at-least-once. A broker outage never fails
//! the request that changed the sale; entries simply wait in the outbox.
//!
//! ## Usage
//! ```rust,ignore
//! let (relay, handle) = OutboxRelay::new(db.clone(), Arc::new(LogPublisher), RelaySettings::default());
//! tokio::spawn(relay.run());
//! // after a write:
//! handle.nudge();
//! ```

pub mod error;
pub mod publisher;
pub mod relay;

pub use error::{EventError, EventResult};
pub use publisher::{
    BroadcastPublisher, EventPublisher, LogPublisher, PublishedEvent, WebhookPublisher,
};
pub use relay::{OutboxRelay, RelayHandle, RelayReport, RelaySettings};
