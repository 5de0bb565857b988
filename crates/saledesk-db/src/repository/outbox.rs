//! # Event Outbox Repository
//!
//! Durable queue of sale lifecycle events awaiting delivery.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  REQUEST (e.g., PUT /api/sales/{id})                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. UPDATE sales / UPSERT sale_items                            │   │
//! │  │  2. INSERT INTO event_outbox (topic, aggregate_id, payload)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            OUTBOX RELAY (saledesk-events, background)           │   │
//! │  │  1. SELECT ... WHERE published_at IS NULL AND attempts < max    │   │
//! │  │  2. For each entry:                                             │   │
//! │  │     a. Publish                                                  │   │
//! │  │     b. On success: published_at = NOW()                         │   │
//! │  │     c. On failure: attempts += 1, last_error = ?                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • An event exists if and only if its sale change was committed        │
//! │  • Delivery failures never undo the sale change                        │
//! │  • Delivery is at-least-once; consumers should dedupe on entry id      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use saledesk_core::{OutboxEntry, SaleEvent};

// =============================================================================
// Row Type
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: String,
    topic: String,
    aggregate_id: String,
    payload: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    attempted_at: Option<DateTime<Utc>>,
    published_at: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for OutboxEntry {
    fn from(row: OutboxRow) -> Self {
        OutboxEntry {
            id: row.id,
            topic: row.topic,
            aggregate_id: row.aggregate_id,
            payload: row.payload,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            attempted_at: row.attempted_at,
            published_at: row.published_at,
        }
    }
}

const SELECT_ENTRY: &str = r#"
    SELECT id, topic, aggregate_id, payload, attempts, last_error,
           created_at, attempted_at, published_at
    FROM event_outbox
"#;

/// Appends events inside a caller-owned transaction.
///
/// Used by [`SaleRepository`](crate::SaleRepository) so the events commit
/// or roll back together with the sale change.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    events: &[SaleEvent],
    created_at: DateTime<Utc>,
) -> DbResult<()> {
    for event in events {
        let id = Uuid::new_v4().to_string();
        let payload = event.to_payload()?;

        debug!(id = %id, topic = event.topic(), sale_id = %event.sale_id(), "Queueing event");

        sqlx::query(
            r#"
            INSERT INTO event_outbox (id, topic, aggregate_id, payload, attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            "#,
        )
        .bind(&id)
        .bind(event.topic())
        .bind(event.sale_id())
        .bind(&payload)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for event outbox operations.
#[derive(Debug, Clone)]
pub struct EventOutboxRepository {
    pool: SqlitePool,
}

impl EventOutboxRepository {
    /// Creates a new EventOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventOutboxRepository { pool }
    }

    /// Gets undelivered entries that still have attempts left, oldest first.
    ///
    /// ## Arguments
    /// * `limit` - Maximum entries to return (batch size)
    /// * `max_attempts` - Entries with this many failed attempts are skipped
    pub async fn get_pending(&self, limit: i64, max_attempts: i64) -> DbResult<Vec<OutboxEntry>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            r#"{SELECT_ENTRY}
            WHERE published_at IS NULL AND attempts < ?1
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?2"#
        ))
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OutboxEntry::from).collect())
    }

    /// Every entry for one sale, in the order they were queued.
    pub async fn list_for_aggregate(&self, aggregate_id: &str) -> DbResult<Vec<OutboxEntry>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "{SELECT_ENTRY} WHERE aggregate_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OutboxEntry::from).collect())
    }

    /// Marks an entry as delivered.
    pub async fn mark_published(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE event_outbox
            SET published_at = ?2, attempted_at = ?2, attempts = attempts + 1, last_error = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "Outbox entry published");
        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE event_outbox
            SET attempts = attempts + 1, last_error = ?2, attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, error = %error, "Outbox delivery failed");
        Ok(())
    }

    /// Counts undelivered entries, exhausted ones included.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_outbox WHERE published_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Counts entries that ran out of attempts and will not be retried.
    pub async fn count_exhausted(&self, max_attempts: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_outbox WHERE published_at IS NULL AND attempts >= ?1",
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Deletes delivered entries older than `days`.
    ///
    /// ## Returns
    /// Number of entries removed.
    pub async fn cleanup_published(&self, days: i64) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(days);

        let result = sqlx::query(
            "DELETE FROM event_outbox WHERE published_at IS NOT NULL AND published_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
