//! # Outbox Relay
//!
//! Background task that drains the event_outbox table into a publisher.
//!
//! ## Relay Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         OutboxRelay::run                                │
//! │                                                                         │
//! │   poll tick ──┐                                                         │
//! │   nudge ──────┼──► process_batch()                                      │
//! │               │      1. get_pending(batch_size, max_attempts)           │
//! │               │      2. for each entry, oldest first:                   │
//! │               │           publisher.publish(entry)                      │
//! │               │           ├── Ok  → mark_published                      │
//! │               │           └── Err → mark_failed(error)                  │
//! │               │                     later entries of that sale wait     │
//! │               │                                                         │
//! │   cleanup tick ───► cleanup_published(retention_days)                   │
//! │   shutdown ───────► break                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Entries go out in the order they were queued. When one entry of a sale
//! fails, the rest of that sale's entries in the batch are left for the next
//! pass, so a consumer never sees `SaleCancelled` before the `SaleModified`
//! queued with it. Entries that used up `max_attempts` are no longer picked
//! up and stay in the table for inspection.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{EventError, EventResult};
use crate::publisher::EventPublisher;
use saledesk_db::Database;

// =============================================================================
// Settings
// =============================================================================

/// Shortest poll or cleanup period the relay will run with. A zero
/// `Duration` is raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Relay tuning knobs.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// How often the outbox is polled.
    pub poll_interval: Duration,

    /// Maximum entries per pass.
    pub batch_size: i64,

    /// Failed attempts after which an entry is given up on.
    pub max_attempts: i64,

    /// Published entries older than this many days are deleted.
    /// `None` keeps them forever.
    pub retention_days: Option<i64>,

    /// How often the retention cleanup runs.
    pub cleanup_interval: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
            max_attempts: 10,
            retention_days: Some(7),
            cleanup_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// What one pass over the outbox did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub published: usize,
    pub failed: usize,
    /// Left for the next pass behind an earlier failure of the same sale.
    pub deferred: usize,
}

// =============================================================================
// Relay
// =============================================================================

/// Delivers queued events to an [`EventPublisher`].
pub struct OutboxRelay {
    db: Database,
    publisher: Arc<dyn EventPublisher>,
    settings: RelaySettings,
    nudge_rx: mpsc::Receiver<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling a running relay.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    nudge_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
    max_attempts: i64,
}

impl RelayHandle {
    /// Attempts after which the relay gives up on an entry.
    pub fn max_attempts(&self) -> i64 {
        self.max_attempts
    }

    /// Asks the relay to poll now instead of waiting for the next tick.
    ///
    /// Never blocks. If a nudge is already pending this one is dropped,
    /// the pending pass will pick up the new entries anyway.
    pub fn nudge(&self) {
        if self.nudge_tx.try_send(()).is_err() {
            debug!("Relay nudge already pending");
        }
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> EventResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| EventError::ChannelClosed("Shutdown channel closed".into()))
    }
}

impl OutboxRelay {
    /// Creates a relay and the handle that controls it.
    pub fn new(
        db: Database,
        publisher: Arc<dyn EventPublisher>,
        settings: RelaySettings,
    ) -> (Self, RelayHandle) {
        let (nudge_tx, nudge_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let handle = RelayHandle {
            nudge_tx,
            shutdown_tx,
            max_attempts: settings.max_attempts,
        };
        let relay = OutboxRelay {
            db,
            publisher,
            settings,
            nudge_rx,
            shutdown_rx,
        };

        (relay, handle)
    }

    /// Runs the relay loop until shutdown.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(
            publisher = self.publisher.name(),
            poll_ms = self.settings.poll_interval.as_millis() as u64,
            batch_size = self.settings.batch_size,
            "Outbox relay starting"
        );

        let mut poll = tokio::time::interval(self.settings.poll_interval.max(MIN_INTERVAL));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut cleanup = tokio::time::interval(self.settings.cleanup_interval.max(MIN_INTERVAL));
        cleanup.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll.tick() => self.drain().await,

                Some(()) = self.nudge_rx.recv() => self.drain().await,

                _ = cleanup.tick() => {
                    if let Err(e) = self.cleanup().await {
                        error!(?e, "Failed to clean up outbox");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Outbox relay shutting down");
                    break;
                }
            }
        }

        info!("Outbox relay stopped");
    }

    async fn drain(&self) {
        if let Err(e) = self.process_batch().await {
            error!(?e, "Failed to process outbox batch");
        }
    }

    /// Delivers one batch of pending entries.
    pub async fn process_batch(&self) -> EventResult<RelayReport> {
        let outbox = self.db.outbox();
        let entries = outbox
            .get_pending(self.settings.batch_size, self.settings.max_attempts)
            .await?;

        let mut report = RelayReport::default();
        if entries.is_empty() {
            return Ok(report);
        }

        debug!(count = entries.len(), "Processing outbox batch");

        let mut blocked: HashSet<String> = HashSet::new();

        for entry in entries {
            if blocked.contains(&entry.aggregate_id) {
                report.deferred += 1;
                continue;
            }

            match self.publisher.publish(&entry).await {
                Ok(()) => {
                    outbox.mark_published(&entry.id).await?;
                    report.published += 1;
                }
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    if attempts >= self.settings.max_attempts {
                        warn!(
                            id = %entry.id,
                            topic = %entry.topic,
                            sale_id = %entry.aggregate_id,
                            attempts,
                            error = %e,
                            "Giving up on event after max attempts"
                        );
                    } else {
                        warn!(
                            id = %entry.id,
                            topic = %entry.topic,
                            attempts,
                            error = %e,
                            "Event delivery failed, will retry"
                        );
                    }

                    outbox.mark_failed(&entry.id, &e.to_string()).await?;
                    blocked.insert(entry.aggregate_id);
                    report.failed += 1;
                }
            }
        }

        if report.published > 0 || report.failed > 0 {
            info!(
                published = report.published,
                failed = report.failed,
                deferred = report.deferred,
                "Outbox batch processed"
            );
        }

        Ok(report)
    }

    /// Deletes published entries past the retention window.
    pub async fn cleanup(&self) -> EventResult<u64> {
        let Some(days) = self.settings.retention_days else {
            return Ok(0);
        };

        let removed = self.db.outbox().cleanup_published(days).await?;
        if removed > 0 {
            info!(removed, days, "Removed published outbox entries");
        }
        Ok(removed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::BroadcastPublisher;
    use async_trait::async_trait;
    use chrono::Utc;
    use saledesk_core::{Money, OutboxEntry, Sale, SaleEvent, SaleUpdate};
    use saledesk_db::DbConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails every delivery, recording the topics it saw.
    #[derive(Default)]
    struct FailingPublisher {
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn publish(&self, entry: &OutboxEntry) -> EventResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(entry.topic.clone());
            Err(EventError::Delivery("broker unavailable".into()))
        }
    }

    async fn db_with_sale() -> (Database, Sale) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let mut sale = Sale::new("S-1", now, "Acme", "North", now);
        sale.add_item("Monitor", 4, Money::from_major(100));
        sale.apply_discount_rules().unwrap();
        db.sales()
            .insert(&sale, &[SaleEvent::created(&sale)])
            .await
            .unwrap();
        (db, sale)
    }

    fn settings(max_attempts: i64) -> RelaySettings {
        RelaySettings {
            max_attempts,
            ..RelaySettings::default()
        }
    }

    #[tokio::test]
    async fn test_batch_publishes_and_marks_entries() {
        let (db, sale) = db_with_sale().await;
        let publisher = Arc::new(BroadcastPublisher::new(16));
        let mut rx = publisher.subscribe();
        let (relay, _handle) = OutboxRelay::new(db.clone(), publisher, settings(5));

        let report = relay.process_batch().await.unwrap();

        assert_eq!(report, RelayReport { published: 1, failed: 0, deferred: 0 });
        assert_eq!(rx.recv().await.unwrap().event, SaleEvent::created(&sale));
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);

        let again = relay.process_batch().await.unwrap();
        assert_eq!(again, RelayReport::default());
    }

    #[tokio::test]
    async fn test_failure_keeps_entry_and_defers_same_sale() {
        let (db, mut sale) = db_with_sale().await;

        let update = SaleUpdate {
            sale_number: sale.sale_number.clone(),
            sale_date: sale.sale_date,
            customer: sale.customer.clone(),
            branch: sale.branch.clone(),
            is_cancelled: true,
            items: vec![],
        };
        let now = Utc::now();
        let outcome = sale.merge_update(update, now).unwrap();
        let events = SaleEvent::for_update(&sale, &outcome, "Cancelled by operator", now);
        db.sales().update(&sale, &events).await.unwrap();

        let publisher = Arc::new(FailingPublisher::default());
        let (relay, _handle) = OutboxRelay::new(db.clone(), publisher.clone(), settings(5));

        let report = relay.process_batch().await.unwrap();

        assert_eq!(report.published, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.deferred, 2);
        assert_eq!(
            *publisher.seen.lock().unwrap(),
            vec![SaleEvent::SALE_CREATED_TOPIC.to_string()]
        );

        let pending = db.outbox().get_pending(10, 5).await.unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(
            pending[0].last_error.as_deref(),
            Some("Delivery failed: broker unavailable")
        );
    }

    #[tokio::test]
    async fn test_exhausted_entries_are_not_retried() {
        let (db, _) = db_with_sale().await;
        let publisher = Arc::new(FailingPublisher::default());
        let (relay, _handle) = OutboxRelay::new(db.clone(), publisher.clone(), settings(2));

        relay.process_batch().await.unwrap();
        relay.process_batch().await.unwrap();
        let report = relay.process_batch().await.unwrap();

        assert_eq!(report, RelayReport::default());
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(db.outbox().count_exhausted(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_respects_retention() {
        let (db, _) = db_with_sale().await;
        let (relay, _handle) =
            OutboxRelay::new(db.clone(), Arc::new(BroadcastPublisher::new(4)), settings(5));
        relay.process_batch().await.unwrap();

        assert_eq!(relay.cleanup().await.unwrap(), 0);

        let (keep_all, _handle) = OutboxRelay::new(
            db,
            Arc::new(BroadcastPublisher::new(4)),
            RelaySettings {
                retention_days: None,
                ..RelaySettings::default()
            },
        );
        assert_eq!(keep_all.cleanup().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nudge_triggers_delivery_and_shutdown_stops() {
        let (db, sale) = db_with_sale().await;
        let publisher = Arc::new(BroadcastPublisher::new(16));
        let mut rx = publisher.subscribe();
        let (relay, handle) = OutboxRelay::new(
            db,
            publisher,
            RelaySettings {
                poll_interval: Duration::from_secs(3600),
                ..RelaySettings::default()
            },
        );

        let task = tokio::spawn(relay.run());
        handle.nudge();

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event.sale_id(), sale.id);

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_intervals_still_deliver() {
        let (db, sale) = db_with_sale().await;
        let publisher = Arc::new(BroadcastPublisher::new(16));
        let mut rx = publisher.subscribe();
        let (relay, handle) = OutboxRelay::new(
            db,
            publisher,
            RelaySettings {
                poll_interval: Duration::ZERO,
                cleanup_interval: Duration::ZERO,
                ..RelaySettings::default()
            },
        );

        let task = tokio::spawn(relay.run());

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event.sale_id(), sale.id);

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
