//! # Balcao DB
//!
//! SQLite persistence layer for Balcao POS.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           balcao-db                                     │
//! │                                                                         │
//! │  Database (pool.rs)                                                     │
//! │       │                                                                 │
//! │       ├── products()  → ProductRepository   catalog reads + CRUD       │
//! │       ├── sales()     → SaleRepository      sale/line-item reads       │
//! │       ├── movements() → MovementRepository  stock ledger reads         │
//! │       ├── reports()   → Reports             read-only aggregates       │
//! │       │                                                                 │
//! │       └── engine()    → SaleEngine          the ONLY writer for        │
//! │                         commit / cancel /   sales, stock and the       │
//! │                         adjust_stock        movement ledger            │
//! │                                                                         │
//! │  Pure domain types and cart logic live in balcao-core; this crate      │
//! │  owns everything that touches SQLite.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity Contract
//! A committed sale is exactly: one sale header, its line items, the guarded
//! stock decrements and one ledger row per line - in a single transaction.
//! Any failure rolls back all of it; retrying a failed commit is always safe.

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod repository;

pub use engine::{CommitError, CommitLine, CommitRequest, CommitResult, SaleEngine};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use reports::{DailySummary, Reports, TopProduct};
pub use repository::movement::MovementRepository;
pub use repository::product::{generate_product_id, ProductRepository};
pub use repository::sale::{generate_sale_item_id, SaleRepository};
