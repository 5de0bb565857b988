//! # Sale Service
//!
//! The request workflows behind the HTTP routes.
//!
//! ## Update Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PUT /api/sales/{id}                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. validate request (400, every failing field)                         │
//! │  2. load sale (404)                                                     │
//! │  3. merge_update on the loaded sale (422 on a pricing violation)        │
//! │  4. build events from the merge outcome                                 │
//! │  5. save sale + events in one transaction                               │
//! │  6. nudge the relay                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two updates of the same sale racing each other are not coordinated; the
//! later save wins.

use chrono::Utc;
use tracing::{debug, info};

use saledesk_core::validation::validate_uuid;
use saledesk_core::{price_line, Money, Sale, SaleEvent};
use saledesk_db::Database;
use saledesk_events::RelayHandle;

use crate::dto::{
    CreateSaleRequest, HealthResponse, PreviewLine, PricingPreviewRequest, PricingPreviewResponse,
    UpdateSaleRequest,
};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
    relay: Option<RelayHandle>,
}

impl SaleService {
    /// `relay` is nudged after every committed write. `None` leaves the
    /// events to whoever drains the outbox.
    pub fn new(db: Database, relay: Option<RelayHandle>) -> Self {
        SaleService { db, relay }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Validates, prices and stores a new sale with its `SaleCreated` event.
    pub async fn create(&self, request: CreateSaleRequest) -> ApiResult<Sale> {
        let now = Utc::now();
        request.validate(now)?;

        let mut sale = request.into_sale(now);
        sale.apply_discount_rules()?;

        self.db
            .sales()
            .insert(&sale, &[SaleEvent::created(&sale)])
            .await?;
        self.notify();

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            items = sale.items.len(),
            total = %sale.total_amount(),
            "Sale created"
        );

        Ok(sale)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Sale> {
        validate_uuid("id", id)?;

        self.db
            .sales()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", id))
    }

    pub async fn list(&self) -> ApiResult<Vec<Sale>> {
        let sales = self.db.sales().list_all().await?;
        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Merges the request into the stored sale. See the module docs.
    pub async fn update(&self, id: &str, request: UpdateSaleRequest) -> ApiResult<Sale> {
        request.validate(id)?;

        let mut sale = self
            .db
            .sales()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", id))?;

        let now = Utc::now();
        let reason = request.cancellation_reason();
        let outcome = sale.merge_update(request.into_update(), now)?;
        let events = SaleEvent::for_update(&sale, &outcome, &reason, now);

        self.db.sales().update(&sale, &events).await?;
        self.notify();

        info!(
            sale_id = %sale.id,
            inserted = outcome.inserted_item_ids.len(),
            cancelled_items = outcome.cancelled_items.len(),
            sale_cancelled = outcome.sale_cancelled,
            total = %sale.total_amount(),
            "Sale updated"
        );

        Ok(sale)
    }

    /// Deletes a sale and its items. No event is emitted.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        validate_uuid("id", id)?;

        if !self.db.sales().delete(id).await? {
            return Err(ApiError::not_found("Sale", id));
        }

        info!(sale_id = %id, "Sale deleted");
        Ok(())
    }

    /// Prices lines without touching the database.
    pub fn preview(&self, request: PricingPreviewRequest) -> ApiResult<PricingPreviewResponse> {
        request.validate()?;

        let mut lines = Vec::with_capacity(request.products.len());
        for line in request.products {
            lines.push(PreviewLine {
                product_name: line.product_name,
                priced: price_line(line.quantity, line.unit_price)?,
            });
        }

        let total_amount: Money = lines.iter().map(|line| line.priced.total).sum();
        Ok(PricingPreviewResponse {
            lines,
            total_amount,
        })
    }

    pub async fn health(&self) -> HealthResponse {
        if !self.db.health_check().await {
            return HealthResponse {
                status: "degraded",
                database: "down",
                pending_events: None,
                exhausted_events: None,
            };
        }

        let outbox = self.db.outbox();
        let exhausted_events = match &self.relay {
            Some(relay) => outbox.count_exhausted(relay.max_attempts()).await.ok(),
            None => None,
        };

        HealthResponse {
            status: "ok",
            database: "up",
            pending_events: outbox.count_pending().await.ok(),
            exhausted_events,
        }
    }

    fn notify(&self) {
        if let Some(relay) = &self.relay {
            relay.nudge();
        }
    }
}
