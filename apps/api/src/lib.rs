//! # Saledesk API Library
//!
//! HTTP layer of the sales service. `main.rs` wires these pieces together;
//! integration tests drive [`build_router`] directly.
//!
//! ## Module Organization
//! ```text
//! saledesk_api/
//! ├── lib.rs          ◄─── You are here
//! ├── config.rs       ◄─── saledesk.toml + SALEDESK_* overrides
//! ├── routes.rs       ◄─── Router and middleware
//! ├── handlers/
//! │   ├── sales.rs    ◄─── CRUD endpoints
//! │   ├── pricing.rs  ◄─── Discount preview
//! │   └── health.rs   ◄─── Liveness + DB check
//! ├── service.rs      ◄─── Create / update / delete workflows
//! ├── dto.rs          ◄─── Wire shapes and conversions
//! ├── state.rs        ◄─── Shared handler state
//! └── error.rs        ◄─── ApiError → HTTP response
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::build_router;
pub use service::SaleService;
pub use state::AppState;
