//! # Event Error Types
//!
//! Errors raised while delivering outbox entries.
//!
//! None of these ever reach an HTTP caller: by the time an event is
//! delivered, the sale change that produced it has long been committed.
//! The relay logs them and records them on the outbox row.

use saledesk_db::DbError;
use thiserror::Error;

/// Result type alias for event delivery.
pub type EventResult<T> = Result<T, EventError>;

/// Event delivery error.
#[derive(Debug, Error)]
pub enum EventError {
    /// The receiving side rejected or didn't accept the event.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// HTTP client error (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An outbox payload isn't a valid event.
    #[error("Invalid event payload in outbox entry {id}: {reason}")]
    InvalidPayload { id: String, reason: String },

    /// Reading or updating the outbox failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelClosed(String),
}
