//! # Commands Module
//!
//! Every operation the back office exposes. Each command takes the state
//! it needs, converts boundary values (decimal amounts, item codes, invoice
//! numbers) and delegates to `lazordy-db`.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── numbering.rs  ◄─── allocate_invoice_number
//! ├── stock.rs      ◄─── apply_stock_movement, restock, reversals
//! ├── invoice.rs    ◄─── mutate_invoice_items, get_invoice_totals, lifecycle
//! └── product.rs    ◄─── catalog lookups
//! ```
//!
//! ## Signature Shape
//! ```rust,ignore
//! // Only needs the database
//! async fn get_invoice_totals(db: &DbState, invoice: &str)
//!     -> Result<InvoiceTotalsDto, ApiError>
//!
//! // Needs configuration too
//! async fn issue_share_token(db: &DbState, config: &AppConfig, invoice: &str)
//!     -> Result<ShareLink, ApiError>
//! ```

pub mod invoice;
pub mod numbering;
pub mod product;
pub mod stock;

pub use invoice::{
    add_custom_line, add_product_line, best_sellers, cancel_invoice, create_invoice, get_invoice,
    get_invoice_totals, issue_share_token, list_invoices, mutate_invoice_items,
    open_shared_invoice, set_discounts, settle_payment,
};
pub use numbering::allocate_invoice_number;
pub use product::{create_product, get_product, low_stock_products, search_products};
pub use stock::{apply_stock_movement, restock, reverse_stock_movement, stock_history};
