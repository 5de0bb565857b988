//! # Event Publishers
//!
//! Where delivered events end up.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OutboxRelay ──► dyn EventPublisher                                     │
//! │                  │                                                      │
//! │                  ├── LogPublisher        one `info` line per event      │
//! │                  ├── WebhookPublisher    POST {id, topic, payload}      │
//! │                  └── BroadcastPublisher  tokio broadcast channel        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A publisher returns `Ok(())` only once the event has been handed off.
//! Anything else counts as a failed attempt and the relay retries later.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{EventError, EventResult};
use saledesk_core::{OutboxEntry, SaleEvent};

/// Destination for outbox entries.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Delivers one entry.
    async fn publish(&self, entry: &OutboxEntry) -> EventResult<()>;
}

// =============================================================================
// Log Publisher
// =============================================================================

/// Writes each event to the log. The default when no broker is configured.
#[derive(Debug, Default, Clone)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, entry: &OutboxEntry) -> EventResult<()> {
        info!(
            id = %entry.id,
            topic = %entry.topic,
            sale_id = %entry.aggregate_id,
            payload = %entry.payload,
            "Event published"
        );
        Ok(())
    }
}

// =============================================================================
// Webhook Publisher
// =============================================================================

/// Body posted to the webhook.
#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    id: &'a str,
    topic: &'a str,
    payload: serde_json::Value,
}

/// POSTs each event as JSON to a fixed URL.
///
/// ## Request
/// ```json
/// {
///   "id": "<outbox entry id>",
///   "topic": "sales-modified",
///   "payload": { "event": "SaleModified", "saleId": "…", "modifiedAt": "…" }
/// }
/// ```
///
/// Any non-2xx response is a failed attempt. Receivers should dedupe on `id`
/// since a timed-out request may still have been processed.
#[derive(Debug, Clone)]
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: String,
}

impl WebhookPublisher {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: impl Into<String>, timeout: Duration) -> EventResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(WebhookPublisher {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventPublisher for WebhookPublisher {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn publish(&self, entry: &OutboxEntry) -> EventResult<()> {
        let payload: serde_json::Value =
            serde_json::from_str(&entry.payload).map_err(|e| EventError::InvalidPayload {
                id: entry.id.clone(),
                reason: e.to_string(),
            })?;

        let body = WebhookBody {
            id: &entry.id,
            topic: &entry.topic,
            payload,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(EventError::Delivery(format!(
                "webhook returned {} for {}",
                status, entry.topic
            )));
        }

        debug!(id = %entry.id, status = %status, "Webhook accepted event");
        Ok(())
    }
}

// =============================================================================
// Broadcast Publisher
// =============================================================================

/// An event as seen by in-process subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    /// Outbox entry id, stable across redeliveries.
    pub id: String,
    pub topic: String,
    pub event: SaleEvent,
}

/// Fans events out to in-process subscribers over a tokio broadcast channel.
///
/// With no live subscriber the event is dropped and still counts as
/// delivered; nobody is listening to retry for.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<PublishedEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        BroadcastPublisher { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    async fn publish(&self, entry: &OutboxEntry) -> EventResult<()> {
        let event =
            SaleEvent::from_payload(&entry.payload).map_err(|e| EventError::InvalidPayload {
                id: entry.id.clone(),
                reason: e.to_string(),
            })?;

        let published = PublishedEvent {
            id: entry.id.clone(),
            topic: entry.topic.clone(),
            event,
        };

        if self.tx.send(published).is_err() {
            debug!(id = %entry.id, "No broadcast subscribers, event dropped");
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
