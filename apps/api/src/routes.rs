//! # Router
//!
//! ```text
//! /health                    GET
//! /api/sales                 GET  POST
//! /api/sales/{id}            GET  PUT  DELETE
//! /api/pricing/preview       POST
//! ```

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, pricing, sales};
use crate::state::AppState;

/// Builds the full application router with request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/sales", post(sales::create_sale).get(sales::list_sales))
        .route(
            "/api/sales/{id}",
            get(sales::get_sale)
                .put(sales::update_sale)
                .delete(sales::delete_sale),
        )
        .route("/api/pricing/preview", post(pricing::preview))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
