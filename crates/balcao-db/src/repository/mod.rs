//! # Repository Module
//!
//! Database repository implementations for Balcao POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Responsibilities                          │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │  db.products().get_by_id(id)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository  ← catalog store: reads, CRUD, soft delete          │
//! │  SaleRepository     ← sale/line-item reads                             │
//! │  MovementRepository ← stock ledger reads                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that must be atomic across tables (sale header, items, stock   │
//! │  decrements, ledger appends) do NOT go through the pool-backed         │
//! │  repositories. They are `pub(crate)` helpers taking the engine's       │
//! │  transaction connection, so a decrement can never be committed         │
//! │  without its movement row.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD and stock reads
//! - [`sale::SaleRepository`] - Sale and sale item reads
//! - [`movement::MovementRepository`] - Stock ledger reads

pub mod movement;
pub mod product;
pub mod sale;
