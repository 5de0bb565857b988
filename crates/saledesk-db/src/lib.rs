//! # saledesk-db: Database Layer for Saledesk
//!
//! Persists sales, their items and the event outbox in SQLite through sqlx.
//! Every sale write and the events it produces commit together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Saledesk Data Flow                               │
//! │                                                                         │
//! │  SaleService (apps/api)                     OutboxRelay (events)       │
//! │       │                                            │                    │
//! │       ▼                                            ▼                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   saledesk-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐    ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories   │    │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                  │    │ (embedded) │  │   │
//! │  │   │               │    │ SaleRepository   │    │            │  │   │
//! │  │   │ SqlitePool    │◄───│ EventOutbox-     │    │ 001_init   │  │   │
//! │  │   │               │    │   Repository     │    │            │  │   │
//! │  │   └───────────────┘    └──────────────────┘    └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite: sales, sale_items, event_outbox                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - `DbConfig` and the shared `Database` handle
//! - [`migrations`] - schema scripts compiled into the binary
//! - [`error`] - `DbError` and the sqlx mapping
//! - [`repository`] - sales (with items) and the event outbox
//!
//! ## Usage
//!
//! ```rust,ignore
//! use saledesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("saledesk.db")).await?;
//! let sales = db.sales().list_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::outbox::EventOutboxRepository;
pub use repository::sale::SaleRepository;
