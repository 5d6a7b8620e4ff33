//! # Domain Types
//!
//! Core domain types used throughout the Lazordy back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Invoice     │   │ InvoiceLineItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  item_code      │   │  number (LZR-)  │   │  invoice_id     │       │
//! │  │  price_cents    │   │  status, source │   │  product_id?    │       │
//! │  │  quantity >= 0  │   │  discounts      │   │  unit_price     │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                                                             │
//! │  ┌────────▼────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │StockLedgerEntry │   │  InvoiceStatus  │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  delta (signed) │   │  Draft          │   │  Cash           │       │
//! │  │  kind           │   │  Paid           │   │  Visa           │       │
//! │  │  resulting_qty  │   │  Uncompleted    │   │  Instapay       │       │
//! │  └─────────────────┘   │  Cancelled      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4, immutable, used for database relations
//! - Business ID: (item_code, invoice number) - human-readable

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Item code - unique business identifier printed on tags.
    pub item_code: String,

    /// Display name shown on invoices.
    pub name: String,

    pub description: Option<String>,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents (margin reporting).
    pub cost_cents: Option<i64>,

    /// On-hand quantity. Never negative in a committed state.
    pub quantity: i64,

    /// At or below this quantity the product counts as low stock.
    pub low_stock_threshold: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Bumped on every write to the row.
    pub version: i64,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Derived availability for list views.
    pub fn availability(&self) -> StockAvailability {
        StockAvailability::from_levels(self.quantity, self.low_stock_threshold)
    }
}

/// Input for creating a product. Quantity starts at the given opening stock
/// and is recorded as a restock entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub item_code: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub opening_quantity: i64,
    pub low_stock_threshold: Option<i64>,
}

/// Catalog fields an operator may edit. Quantity is never edited directly;
/// it only moves through the stock ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub low_stock_threshold: Option<i64>,
}

// =============================================================================
// Stock Availability
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockAvailability {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockAvailability {
    /// Classifies a stock level.
    ///
    /// ```rust
    /// use lazordy_core::StockAvailability;
    ///
    /// assert_eq!(StockAvailability::from_levels(0, 1), StockAvailability::OutOfStock);
    /// assert_eq!(StockAvailability::from_levels(1, 1), StockAvailability::LowStock);
    /// assert_eq!(StockAvailability::from_levels(2, 1), StockAvailability::InStock);
    /// ```
    pub fn from_levels(quantity: i64, threshold: i64) -> Self {
        if quantity <= 0 {
            StockAvailability::OutOfStock
        } else if quantity <= threshold {
            StockAvailability::LowStock
        } else {
            StockAvailability::InStock
        }
    }
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Why a product's quantity moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockMovementKind {
    /// Goods received. Delta must be positive.
    Restock,
    /// Goods leaving on an invoice. Delta must be negative.
    Sale,
    /// Manual correction, returns, reversals. Either sign.
    Adjustment,
}

impl StockMovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockMovementKind::Restock => "restock",
            StockMovementKind::Sale => "sale",
            StockMovementKind::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for StockMovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StockMovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "restock" => Ok(StockMovementKind::Restock),
            "sale" => Ok(StockMovementKind::Sale),
            "adjustment" => Ok(StockMovementKind::Adjustment),
            other => Err(format!("unknown stock movement kind: {other}")),
        }
    }
}

/// One immutable record of a quantity change.
///
/// Entries are never updated or deleted. Undoing an entry means writing a new
/// `Adjustment` whose `reverses_entry_id` points back at it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLedgerEntry {
    pub id: String,
    pub product_id: String,
    /// Signed quantity change.
    pub delta: i64,
    pub kind: StockMovementKind,
    pub reason: String,
    /// Free-form reference, usually the invoice id.
    pub reference: Option<String>,
    pub reverses_entry_id: Option<String>,
    /// Product quantity right after this entry was applied.
    pub resulting_quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Nothing paid yet.
    Draft,
    /// Nothing remaining.
    Paid,
    /// Partially paid.
    Uncompleted,
    /// Voided by an operator. Never re-derived.
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Uncompleted => "uncompleted",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the current status came from.
///
/// A `Paid` reached by recomputation can fall back to `Uncompleted` when a
/// line item is added later. A `Paid` reached by an explicit settlement stays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// Set by the totals calculator.
    Derived,
    /// Set by an explicit operator action (settle or cancel).
    Manual,
}

impl Default for StatusSource {
    fn default() -> Self {
        StatusSource::Derived
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Visa,
    Instapay,
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "visa" => Ok(PaymentMethod::Visa),
            "instapay" => Ok(PaymentMethod::Instapay),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice header.
///
/// `subtotal_cents`, `total_cents` and `amount_remaining_cents` are the last
/// values written by the totals calculator. Readers that need the truth call
/// the calculator again over the line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// `LZR-YYYY-MM-NNNN`, or a `-FIX-` fallback.
    pub number: String,
    pub customer_id: Option<String>,
    pub discount_cents: i64,
    pub manager_discount_cents: i64,
    pub manager_discount_reason: Option<String>,
    pub amount_paid_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub status: InvoiceStatus,
    pub status_source: StatusSource,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub amount_remaining_cents: i64,
    pub notes: Option<String>,
    pub share_token: Option<String>,
    #[ts(as = "Option<String>")]
    pub share_token_created_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Invoice {
    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn manager_discount(&self) -> Money {
        Money::from_cents(self.manager_discount_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// Cancelled invoices and explicitly settled invoices no longer accept
    /// line item or discount changes.
    pub fn is_locked(&self) -> bool {
        match self.status {
            InvoiceStatus::Cancelled => true,
            InvoiceStatus::Paid => self.status_source == StatusSource::Manual,
            _ => false,
        }
    }

    /// Whether `token` opens this invoice at `now`. Tokens expire `ttl` after
    /// they were issued.
    pub fn share_token_valid_at(&self, token: &str, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (&self.share_token, self.share_token_created_at) {
            (Some(current), Some(issued_at)) => current == token && now < issued_at + ttl,
            _ => false,
        }
    }
}

// =============================================================================
// Invoice Line Item
// =============================================================================

/// What a line item points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItemSource {
    /// A catalog product. Moves stock.
    Product { product_id: String },
    /// A free-text item. Never touches stock.
    Custom { name: String },
}

/// A line on an invoice.
///
/// Uses the snapshot pattern: name, item code and unit price are frozen when
/// the line is added, so later catalog edits never rewrite old invoices.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceLineItem {
    pub id: String,
    pub invoice_id: String,
    /// Set for product-linked lines, `None` for custom lines.
    pub product_id: Option<String>,
    pub item_code_snapshot: Option<String>,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InvoiceLineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Always recomputed, never stored.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    pub fn source(&self) -> LineItemSource {
        match &self.product_id {
            Some(product_id) => LineItemSource::Product {
                product_id: product_id.clone(),
            },
            None => LineItemSource::Custom {
                name: self.name_snapshot.clone(),
            },
        }
    }
}

/// A line item about to be added.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLineItem {
    pub source: LineItemSource,
    pub quantity: i64,
    /// Price override. Linked products fall back to the catalog price when
    /// this is absent or zero.
    pub unit_price_cents: Option<i64>,
}

/// A single mutation of an invoice's line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InvoiceItemOp {
    Add(NewLineItem),
    UpdateQuantity { item_id: String, quantity: i64 },
    Remove { item_id: String },
}

// =============================================================================
// Reporting
// =============================================================================

/// Units sold per product over non-cancelled invoices.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BestSeller {
    pub product_id: String,
    pub item_code: String,
    pub name: String,
    pub units_sold: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_invoice(status: InvoiceStatus, source: StatusSource) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: "inv-1".to_string(),
            number: "LZR-2026-10-0001".to_string(),
            customer_id: None,
            discount_cents: 0,
            manager_discount_cents: 0,
            manager_discount_reason: None,
            amount_paid_cents: 0,
            payment_method: None,
            status,
            status_source: source,
            subtotal_cents: 0,
            total_cents: 0,
            amount_remaining_cents: 0,
            notes: None,
            share_token: None,
            share_token_created_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    #[test]
    fn test_invoice_status_default() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
        assert_eq!(InvoiceStatus::Uncompleted.to_string(), "uncompleted");
    }

    #[test]
    fn test_invoice_lock_rules() {
        assert!(sample_invoice(InvoiceStatus::Cancelled, StatusSource::Manual).is_locked());
        assert!(sample_invoice(InvoiceStatus::Paid, StatusSource::Manual).is_locked());
        assert!(!sample_invoice(InvoiceStatus::Paid, StatusSource::Derived).is_locked());
        assert!(!sample_invoice(InvoiceStatus::Draft, StatusSource::Derived).is_locked());
    }

    #[test]
    fn test_share_token_expiry() {
        let mut invoice = sample_invoice(InvoiceStatus::Draft, StatusSource::Derived);
        let ttl = Duration::minutes(60);
        let issued = invoice.created_at;
        assert!(!invoice.share_token_valid_at("abc", issued, ttl));

        invoice.share_token = Some("abc".to_string());
        invoice.share_token_created_at = Some(issued);
        assert!(invoice.share_token_valid_at("abc", issued + Duration::minutes(59), ttl));
        assert!(!invoice.share_token_valid_at("abc", issued + Duration::minutes(60), ttl));
        assert!(!invoice.share_token_valid_at("xyz", issued, ttl));
    }

    #[test]
    fn test_line_item_source_and_subtotal() {
        let item = InvoiceLineItem {
            id: "li-1".to_string(),
            invoice_id: "inv-1".to_string(),
            product_id: None,
            item_code_snapshot: None,
            name_snapshot: "Engraving".to_string(),
            quantity: 3,
            unit_price_cents: 2550,
            created_at: Utc::now(),
        };

        assert_eq!(item.subtotal().cents(), 7650);
        assert_eq!(
            item.source(),
            LineItemSource::Custom {
                name: "Engraving".to_string()
            }
        );
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("VISA".parse::<PaymentMethod>(), Ok(PaymentMethod::Visa));
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert_eq!(
            "restock".parse::<StockMovementKind>(),
            Ok(StockMovementKind::Restock)
        );
    }

    #[test]
    fn test_item_op_serde_shape() {
        let op: InvoiceItemOp =
            serde_json::from_str(r#"{"op":"remove","item_id":"li-9"}"#).unwrap();
        assert!(matches!(op, InvoiceItemOp::Remove { item_id } if item_id == "li-9"));
    }
}
