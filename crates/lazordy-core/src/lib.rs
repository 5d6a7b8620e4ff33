//! # lazordy-core: Pure Business Logic for the Lazordy Back Office
//!
//! This crate holds the invoicing and stock rules as pure functions with zero
//! I/O dependencies. Everything that touches SQLite lives in `lazordy-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Lazordy Back Office Architecture                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 UI / HTTP / PDF renderer (external)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 back-office (boundary operations)               │   │
//! │  │  allocate_invoice_number, apply_stock_movement,                 │   │
//! │  │  mutate_invoice_items, get_invoice_totals                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ lazordy-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │ numbering │  │   │
//! │  │   │  Product  │  │   Money   │  │ calculate │  │  LZR-...  │  │   │
//! │  │   │  Invoice  │  │  Decimal  │  │  status   │  │  fallback │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  lazordy-db (Database Layer)                    │   │
//! │  │       SQLite, migrations, stock ledger, invoice sequences       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Invoice, line items, ledger entries)
//! - [`money`] - Money type with integer cents and decimal boundary conversion
//! - [`totals`] - The invoice totals calculator and status derivation
//! - [`numbering`] - Invoice number periods, formatting and fallback suffixes
//! - [`stock`] - Stock movement rules (sign checks, availability)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use lazordy_core::money::Money;
//! use lazordy_core::totals::{calculate_totals, LineAmount, StatusState};
//! use lazordy_core::InvoiceStatus;
//!
//! let lines = [LineAmount::new(2, Money::from_cents(5000))];
//! let totals = calculate_totals(
//!     &lines,
//!     Money::from_cents(2000),
//!     Money::from_cents(1000),
//!     Money::from_cents(7000),
//!     StatusState::derived(InvoiceStatus::Draft),
//! );
//!
//! assert_eq!(totals.total.cents(), 7000);
//! assert_eq!(totals.status.status, InvoiceStatus::Paid);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod numbering;
pub mod stock;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use numbering::{InvoiceNumber, InvoicePeriod};
pub use totals::{calculate_totals, InvoiceTotals, LineAmount, StatusState};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default invoice number prefix (`LZR-2026-10-0001`).
pub const DEFAULT_INVOICE_PREFIX: &str = "LZR";

/// Attempts the sequence allocator makes before falling back to a
/// time-based suffix.
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 5;

/// Default share token lifetime in minutes.
pub const DEFAULT_SHARE_TOKEN_TTL_MINUTES: i64 = 60;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest price, discount or payment accepted, in cents (10 billion).
///
/// A line at this price and `MAX_ITEM_QUANTITY` stays far inside i64.
pub const MAX_MONEY_CENTS: i64 = 1_000_000_000_000;

/// Largest single stock movement, in either direction.
pub const MAX_STOCK_DELTA: i64 = 1_000_000;

/// Default low-stock threshold for new products.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 1;
