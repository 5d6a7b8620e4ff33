//! # lazordy-db: Database Layer for the Lazordy Back Office
//!
//! SQLite storage for the catalog, the stock ledger and invoices, with sqlx
//! for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lazordy Data Flow                                │
//! │                                                                         │
//! │  back-office service (mutate_invoice_items)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     lazordy-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ StockLedger   │    │ 001_init.sql │  │   │
//! │  │   │ WAL, busy     │    │ Sequences     │    │              │  │   │
//! │  │   │ timeout       │    │ Products ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/lazordy/lazordy.db                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lazordy_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/lazordy.db")).await?;
//!
//! let created = db.invoices().create(None, None).await?;
//! let totals = db.invoices().mutate_items(&created.invoice.id, &op, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::invoice::{CreatedInvoice, InvoiceRepository};
pub use repository::product::ProductRepository;
pub use repository::sequence::{Allocation, NumberingConfig, SequenceAllocator};
pub use repository::stock::StockLedger;
