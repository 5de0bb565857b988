//! # Application State
//!
//! Shared state handed to every handler through axum's `State` extractor.

use saledesk_db::Database;
use saledesk_events::RelayHandle;

use crate::service::SaleService;

/// Cheap to clone: the database pool and relay handle are shared.
#[derive(Debug, Clone)]
pub struct AppState {
    pub sales: SaleService,
}

impl AppState {
    pub fn new(db: Database, relay: Option<RelayHandle>) -> Self {
        AppState {
            sales: SaleService::new(db, relay),
        }
    }
}
