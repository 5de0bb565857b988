//! # Repository Module
//!
//! Database repository implementations for Saledesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Tracked Update, Made Explicit                        │
//! │                                                                         │
//! │  SaleService::update                                                   │
//! │       │                                                                 │
//! │       │  1. LOAD    db.sales().get_by_id(id)                           │
//! │       │  2. MUTATE  sale.merge_update(update, now)   (saledesk-core)   │
//! │       │  3. SAVE    db.sales().update(&sale, &events)                  │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── insert(&self, sale, events)                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── list_all(&self)                                                   │
//! │  ├── update(&self, sale, events)                                       │
//! │  └── delete(&self, id)                                                 │
//! │       │                                                                 │
//! │       │  One transaction: sale row + item rows + outbox rows           │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SaleRepository`](sale::SaleRepository) - Sale aggregate persistence
//! - [`EventOutboxRepository`](outbox::EventOutboxRepository) - Event outbox queue

pub mod outbox;
pub mod sale;
