//! # HTTP Handlers
//!
//! Thin adapters: extract, call [`SaleService`](crate::service::SaleService),
//! wrap the result in the response envelope.

pub mod health;
pub mod pricing;
pub mod sales;
