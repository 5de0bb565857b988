//! # Sale Repository
//!
//! Persistence for the sale aggregate (a `sales` row plus its `sale_items`).
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       One Write, One Transaction                        │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    ├── INSERT / UPDATE sales                                           │
//! │    ├── UPSERT sale_items        (by id, position = list index)         │
//! │    └── INSERT event_outbox      (one row per SaleEvent)                │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any failure → ROLLBACK: no sale change and no event, or both          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items are never deleted by `update`. Removing an item happens only when
//! the whole sale is deleted.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::outbox;
use saledesk_core::{Money, Sale, SaleEvent, SaleItem};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    sale_number: String,
    sale_date: DateTime<Utc>,
    customer: String,
    branch: String,
    is_cancelled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: self.id,
            sale_number: self.sale_number,
            sale_date: self.sale_date,
            customer: self.customer,
            branch: self.branch,
            is_cancelled: self.is_cancelled,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    product_name: String,
    quantity: i64,
    unit_price: String,
    discount: String,
    is_cancelled: bool,
}

impl TryFrom<SaleItemRow> for SaleItem {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> DbResult<Self> {
        Ok(SaleItem {
            unit_price: parse_money("sale_items.unit_price", &row.unit_price)?,
            discount: parse_money("sale_items.discount", &row.discount)?,
            id: row.id,
            sale_id: row.sale_id,
            product_name: row.product_name,
            quantity: row.quantity,
            is_cancelled: row.is_cancelled,
        })
    }
}

fn parse_money(column: &str, raw: &str) -> DbResult<Money> {
    raw.parse::<Money>()
        .map_err(|e| DbError::invalid_data(column, e))
}

const SELECT_SALE: &str = r#"
    SELECT id, sale_number, sale_date, customer, branch, is_cancelled, created_at, updated_at
    FROM sales
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, sale_id, product_name, quantity, unit_price, discount, is_cancelled
    FROM sale_items
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Stores a new sale, its items, and its events atomically.
    ///
    /// ## Arguments
    /// * `sale` - A priced sale (discount pass already applied)
    /// * `events` - Events to queue in the outbox, usually `[SaleCreated]`
    pub async fn insert(&self, sale: &Sale, events: &[SaleEvent]) -> DbResult<()> {
        debug!(id = %sale.id, sale_number = %sale.sale_number, items = sale.items.len(), "Inserting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, sale_number, sale_date, customer, branch,
                is_cancelled, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.sale_number)
        .bind(sale.sale_date)
        .bind(&sale.customer)
        .bind(&sale.branch)
        .bind(sale.is_cancelled)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        write_items(&mut tx, sale).await?;
        outbox::append(&mut tx, events, sale.updated_at).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets a sale with its items, in insertion order.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, SaleItemRow>(&format!(
            "{SELECT_ITEM} WHERE sale_id = ?1 ORDER BY position"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SaleItem::try_from)
        .collect::<DbResult<Vec<_>>>()?;

        Ok(Some(row.into_sale(items)))
    }

    /// Lists every sale, newest sale date first.
    pub async fn list_all(&self) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "{SELECT_SALE} ORDER BY sale_date DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let item_rows: Vec<SaleItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEM} ORDER BY sale_id, position"))
                .fetch_all(&self.pool)
                .await?;

        let mut items_by_sale: HashMap<String, Vec<SaleItem>> = HashMap::new();
        for row in item_rows {
            let item = SaleItem::try_from(row)?;
            items_by_sale
                .entry(item.sale_id.clone())
                .or_default()
                .push(item);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_sale.remove(&row.id).unwrap_or_default();
                row.into_sale(items)
            })
            .collect())
    }

    /// Saves a sale loaded with [`get_by_id`](Self::get_by_id) and mutated
    /// in memory, plus the events the mutation produced.
    ///
    /// ## Errors
    /// `DbError::NotFound` if the sale was deleted since it was loaded.
    /// Nothing is written in that case.
    pub async fn update(&self, sale: &Sale, events: &[SaleEvent]) -> DbResult<()> {
        debug!(id = %sale.id, items = sale.items.len(), events = events.len(), "Updating sale");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                sale_number = ?2,
                sale_date = ?3,
                customer = ?4,
                branch = ?5,
                is_cancelled = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.sale_number)
        .bind(sale.sale_date)
        .bind(&sale.customer)
        .bind(&sale.branch)
        .bind(sale.is_cancelled)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        write_items(&mut tx, sale).await?;
        outbox::append(&mut tx, events, sale.updated_at).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a sale and all of its items.
    ///
    /// ## Returns
    /// * `true` - The sale existed and is gone
    /// * `false` - No sale with that ID
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counts stored sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Inserts new items and overwrites known ones. Never deletes.
///
/// The update clause is restricted to rows of the same sale, so an item ID
/// can't be used to rewrite another sale's item.
async fn write_items(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    for (position, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, position, product_name, quantity,
                unit_price, discount, is_cancelled
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                position = excluded.position,
                product_name = excluded.product_name,
                quantity = excluded.quantity,
                unit_price = excluded.unit_price,
                discount = excluded.discount,
                is_cancelled = excluded.is_cancelled
            WHERE sale_items.sale_id = excluded.sale_id
            "#,
        )
        .bind(&item.id)
        .bind(&sale.id)
        .bind(position as i64)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price.to_string())
        .bind(item.discount.to_string())
        .bind(item.is_cancelled)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
