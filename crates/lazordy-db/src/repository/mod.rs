//! # Repository Module
//!
//! Database repositories for the back office.
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InvoiceRepository ──┬──► invoices, invoice_items                      │
//! │                      ├──► stock::apply_in_tx   (same transaction)      │
//! │                      └──► SequenceAllocator    (own transaction)       │
//! │                                                                         │
//! │  ProductRepository ──┬──► products (catalog fields only)               │
//! │                      └──► stock::apply_in_tx   (opening stock)         │
//! │                                                                         │
//! │  StockLedger ────────────► products.quantity + stock_ledger            │
//! │                                                                         │
//! │  products.quantity changes only through stock::apply_in_tx, so every  │
//! │  quantity is explained by ledger entries.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - catalog CRUD and search
//! - [`CustomerRepository`](customer::CustomerRepository) - customer records
//! - [`StockLedger`](stock::StockLedger) - stock movements and reversals
//! - [`SequenceAllocator`](sequence::SequenceAllocator) - invoice numbers
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - invoices and line items

pub mod customer;
pub mod invoice;
pub mod product;
pub mod sequence;
pub mod stock;
