//! # Invoice Commands
//!
//! The invoice boundary: creation, line item changes, discounts, payment,
//! cancellation and share links.
//!
//! ## Money at the Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller            Decimal "19.995"                                    │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  Money::from_decimal   → 2000 cents (half away from zero, once)        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  lazordy-db / lazordy-core work in integer cents only                  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  InvoiceTotalsDto   Money::to_decimal → "20.00"                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoices are addressed by number (`LZR-2026-10-0001`) or id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::product::find_product;
use crate::error::ApiError;
use crate::state::{AppConfig, DbState};
use lazordy_core::{
    BestSeller, Invoice, InvoiceItemOp, InvoiceLineItem, InvoiceStatus, InvoiceTotals,
    LineItemSource, Money, NewLineItem, PaymentMethod, StatusSource,
};

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotalsDto {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub manager_discount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub amount_remaining: Decimal,
    pub status: InvoiceStatus,
    /// True once an explicit settlement or cancellation fixed the status.
    pub status_locked: bool,
}

impl From<InvoiceTotals> for InvoiceTotalsDto {
    fn from(t: InvoiceTotals) -> Self {
        InvoiceTotalsDto {
            subtotal: t.subtotal.to_decimal(),
            discount: t.discount.to_decimal(),
            manager_discount: t.manager_discount.to_decimal(),
            total: t.total.to_decimal(),
            amount_paid: t.amount_paid.to_decimal(),
            amount_remaining: t.amount_remaining.to_decimal(),
            status: t.status.status,
            status_locked: t.status.is_sticky(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    pub id: String,
    pub number: String,
    pub customer_id: Option<String>,
    pub status: InvoiceStatus,
    pub status_locked: bool,
    pub payment_method: Option<PaymentMethod>,
    pub total: Decimal,
    pub amount_remaining: Decimal,
    pub notes: Option<String>,
    pub created_at: String,
    pub version: i64,
}

impl From<Invoice> for InvoiceDto {
    fn from(inv: Invoice) -> Self {
        InvoiceDto {
            status_locked: inv.is_locked(),
            total: Money::from_cents(inv.total_cents).to_decimal(),
            amount_remaining: Money::from_cents(inv.amount_remaining_cents).to_decimal(),
            created_at: inv.created_at.to_rfc3339(),
            id: inv.id,
            number: inv.number,
            customer_id: inv.customer_id,
            status: inv.status,
            payment_method: inv.payment_method,
            notes: inv.notes,
            version: inv.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDto {
    pub id: String,
    pub source: LineItemSource,
    pub item_code: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<InvoiceLineItem> for LineItemDto {
    fn from(item: InvoiceLineItem) -> Self {
        LineItemDto {
            source: item.source(),
            unit_price: item.unit_price().to_decimal(),
            line_total: item.subtotal().to_decimal(),
            id: item.id,
            item_code: item.item_code_snapshot,
            name: item.name_snapshot,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub invoice: InvoiceDto,
    pub items: Vec<LineItemDto>,
    pub totals: InvoiceTotalsDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInvoiceDto {
    pub invoice: InvoiceDto,
    /// Set when the invoice got a `-FIX-` fallback number.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub invoice_number: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestSellerDto {
    pub product_id: String,
    pub item_code: String,
    pub name: String,
    pub units_sold: i64,
}

impl From<BestSeller> for BestSellerDto {
    fn from(b: BestSeller) -> Self {
        BestSellerDto {
            product_id: b.product_id,
            item_code: b.item_code,
            name: b.name,
            units_sold: b.units_sold,
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Finds an invoice by number, then by id.
pub async fn resolve_invoice(db: &DbState, key: &str) -> Result<Invoice, ApiError> {
    let invoices = db.inner().invoices();
    let key = key.trim();

    if let Some(invoice) = invoices.get_by_number(key).await? {
        return Ok(invoice);
    }
    invoices
        .get_by_id(key)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", key))
}

async fn detail(db: &DbState, invoice: Invoice) -> Result<InvoiceDetail, ApiError> {
    let invoices = db.inner().invoices();
    let items = invoices.items(&invoice.id).await?;
    let totals = invoices.totals(&invoice.id).await?;

    Ok(InvoiceDetail {
        invoice: InvoiceDto::from(invoice),
        items: items.into_iter().map(LineItemDto::from).collect(),
        totals: InvoiceTotalsDto::from(totals),
    })
}

pub async fn get_invoice(db: &DbState, key: &str) -> Result<InvoiceDetail, ApiError> {
    debug!(key = %key, "get_invoice command");
    let invoice = resolve_invoice(db, key).await?;
    detail(db, invoice).await
}

pub async fn list_invoices(
    db: &DbState,
    status: Option<InvoiceStatus>,
    limit: Option<u32>,
) -> Result<Vec<InvoiceDto>, ApiError> {
    let invoices = db
        .inner()
        .invoices()
        .list(status, limit.unwrap_or(50).min(500))
        .await?;
    Ok(invoices.into_iter().map(InvoiceDto::from).collect())
}

// =============================================================================
// Creation and Line Items
// =============================================================================

/// Creates a draft invoice numbered for the current month.
pub async fn create_invoice(
    db: &DbState,
    customer_id: Option<&str>,
    notes: Option<&str>,
) -> Result<CreatedInvoiceDto, ApiError> {
    debug!(?customer_id, "create_invoice command");

    let created = db.inner().invoices().create(customer_id, notes).await?;
    let warning = created.warning.map(|w| {
        warn!(number = %created.invoice.number, "Invoice created with fallback number");
        w.to_string()
    });

    Ok(CreatedInvoiceDto {
        invoice: InvoiceDto::from(created.invoice),
        warning,
    })
}

/// Applies one line item operation and returns the recomputed totals.
///
/// Stock moves with the line: adding sells, growing sells the difference,
/// shrinking or removing returns it. Everything commits together or not
/// at all. Pass `expected_version` to reject edits based on a stale read.
pub async fn mutate_invoice_items(
    db: &DbState,
    invoice: &str,
    op: InvoiceItemOp,
    expected_version: Option<i64>,
) -> Result<InvoiceTotalsDto, ApiError> {
    let invoice = resolve_invoice(db, invoice).await?;
    debug!(invoice = %invoice.number, ?op, "mutate_invoice_items command");

    let totals = db
        .inner()
        .invoices()
        .mutate_items(&invoice.id, &op, expected_version)
        .await?;
    Ok(InvoiceTotalsDto::from(totals))
}

/// Adds a catalog product. Without a price (or with zero) the catalog
/// price applies.
pub async fn add_product_line(
    db: &DbState,
    invoice: &str,
    product: &str,
    quantity: i64,
    unit_price: Option<Decimal>,
) -> Result<InvoiceTotalsDto, ApiError> {
    let product = find_product(db, product).await?;
    let unit_price_cents = unit_price
        .map(Money::from_decimal)
        .transpose()?
        .map(|m| m.cents());

    let op = InvoiceItemOp::Add(NewLineItem {
        source: LineItemSource::Product {
            product_id: product.id,
        },
        quantity,
        unit_price_cents,
    });
    mutate_invoice_items(db, invoice, op, None).await
}

/// Adds a free-text line. Needs a name and a positive price; no stock moves.
pub async fn add_custom_line(
    db: &DbState,
    invoice: &str,
    name: &str,
    quantity: i64,
    unit_price: Decimal,
) -> Result<InvoiceTotalsDto, ApiError> {
    let op = InvoiceItemOp::Add(NewLineItem {
        source: LineItemSource::Custom {
            name: name.to_string(),
        },
        quantity,
        unit_price_cents: Some(Money::from_decimal(unit_price)?.cents()),
    });
    mutate_invoice_items(db, invoice, op, None).await
}

/// Recomputes totals from the stored lines. Writes nothing.
pub async fn get_invoice_totals(db: &DbState, invoice: &str) -> Result<InvoiceTotalsDto, ApiError> {
    let invoice = resolve_invoice(db, invoice).await?;
    let totals = db.inner().invoices().totals(&invoice.id).await?;
    Ok(InvoiceTotalsDto::from(totals))
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Sets the regular and manager discounts as absolute amounts.
pub async fn set_discounts(
    db: &DbState,
    invoice: &str,
    discount: Decimal,
    manager_discount: Decimal,
    reason: Option<&str>,
) -> Result<InvoiceTotalsDto, ApiError> {
    let invoice = resolve_invoice(db, invoice).await?;
    let discount = Money::from_decimal(discount)?;
    let manager_discount = Money::from_decimal(manager_discount)?;

    let totals = db
        .inner()
        .invoices()
        .set_discounts(&invoice.id, discount, manager_discount, reason, None)
        .await?;
    Ok(InvoiceTotalsDto::from(totals))
}

/// Records a payment. Paying the full balance settles the invoice, after
/// which its lines and discounts are locked.
pub async fn settle_payment(
    db: &DbState,
    invoice: &str,
    amount: Decimal,
    method: PaymentMethod,
) -> Result<InvoiceTotalsDto, ApiError> {
    let invoice = resolve_invoice(db, invoice).await?;
    let amount = Money::from_decimal(amount)?;

    let totals = db
        .inner()
        .invoices()
        .settle_payment(&invoice.id, amount, method, None)
        .await?;

    if totals.status.source == StatusSource::Manual && totals.status.status == InvoiceStatus::Paid {
        info!(invoice = %invoice.number, "Invoice settled");
    }
    Ok(InvoiceTotalsDto::from(totals))
}

/// Cancels an invoice. Remove lines first to put their stock back.
pub async fn cancel_invoice(db: &DbState, invoice: &str) -> Result<InvoiceTotalsDto, ApiError> {
    let invoice = resolve_invoice(db, invoice).await?;
    let totals = db.inner().invoices().cancel(&invoice.id, None).await?;
    Ok(InvoiceTotalsDto::from(totals))
}

/// Issues a share token valid for the configured window.
pub async fn issue_share_token(
    db: &DbState,
    config: &AppConfig,
    invoice: &str,
) -> Result<ShareLink, ApiError> {
    let invoice = resolve_invoice(db, invoice).await?;
    let shared = db.inner().invoices().issue_share_token(&invoice.id).await?;

    let token = shared
        .share_token
        .ok_or_else(|| ApiError::internal("Share token was not stored"))?;
    let issued_at = shared.share_token_created_at.unwrap_or_else(Utc::now);

    Ok(ShareLink {
        invoice_number: shared.number,
        token,
        expires_at: issued_at + config.share_token_ttl(),
    })
}

/// Opens an invoice through its share token. Expired and unknown tokens
/// both report not found.
pub async fn open_shared_invoice(
    db: &DbState,
    config: &AppConfig,
    token: &str,
) -> Result<InvoiceDetail, ApiError> {
    let invoice = db
        .inner()
        .invoices()
        .find_by_share_token(token.trim(), config.share_token_ttl())
        .await?
        .ok_or_else(|| ApiError::not_found("Shared invoice", token))?;
    detail(db, invoice).await
}

pub async fn best_sellers(db: &DbState, limit: Option<u32>) -> Result<Vec<BestSellerDto>, ApiError> {
    let rows = db
        .inner()
        .invoices()
        .best_selling(limit.unwrap_or(10).min(100))
        .await?;
    Ok(rows.into_iter().map(BestSellerDto::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::numbering::allocate_invoice_number;
    use crate::commands::product::{create_product, get_product, CreateProductRequest};
    use crate::commands::stock::apply_stock_movement;
    use crate::error::ErrorCode;
    use lazordy_core::StockMovementKind;
    use lazordy_db::{Database, DbConfig};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn state() -> DbState {
        DbState::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    async fn ring(db: &DbState, code: &str, quantity: i64, price: &str) {
        create_product(
            db,
            CreateProductRequest {
                item_code: code.to_string(),
                name: format!("Ring {code}"),
                description: None,
                price: dec(price),
                cost: None,
                opening_quantity: quantity,
                low_stock_threshold: None,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_invoice_flow_through_the_boundary() {
        let db = state().await;
        ring(&db, "RING-1", 10, "100.00").await;

        let created = create_invoice(&db, None, None).await.unwrap();
        let number = created.invoice.number.clone();
        assert!(created.warning.is_none());

        let totals = add_product_line(&db, &number, "RING-1", 1, None).await.unwrap();
        assert_eq!(totals.subtotal, dec("100.00"));
        assert_eq!(get_product(&db, "RING-1").await.unwrap().quantity, 9);

        let totals = set_discounts(&db, &number, dec("20"), dec("10"), Some("vip")).await.unwrap();
        assert_eq!(totals.total, dec("70.00"));

        let totals = settle_payment(&db, &number, dec("100"), PaymentMethod::Cash).await.unwrap();
        assert_eq!(totals.amount_paid, dec("70.00"));
        assert_eq!(totals.amount_remaining, Decimal::ZERO);
        assert_eq!(totals.status, InvoiceStatus::Paid);
        assert!(totals.status_locked);

        let err = add_custom_line(&db, &number, "Box", 1, dec("5")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatus);

        assert_eq!(get_invoice_totals(&db, &number).await.unwrap(), totals);
        let detail = get_invoice(&db, &created.invoice.id).await.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].item_code.as_deref(), Some("RING-1"));
    }

    #[tokio::test]
    async fn test_decimal_amounts_round_half_away_from_zero() {
        let db = state().await;
        let created = create_invoice(&db, None, None).await.unwrap();
        let number = created.invoice.number;

        let totals = add_custom_line(&db, &number, "Engraving", 1, dec("19.995")).await.unwrap();
        assert_eq!(totals.subtotal, dec("20.00"));

        let err = set_discounts(&db, &number, dec("-1"), Decimal::ZERO, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_oversized_amounts_are_validation_errors() {
        let db = state().await;
        ring(&db, "RING-9", 3, "50").await;
        let created = create_invoice(&db, None, None).await.unwrap();
        let number = created.invoice.number;

        let huge = dec("46116860184273879.04");
        let err = add_custom_line(&db, &number, "Tiara", 2, huge).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        add_custom_line(&db, &number, "Tiara", 1, dec("50")).await.unwrap();
        let err = set_discounts(&db, &number, huge, dec("0.05"), None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = add_custom_line(&db, &number, "Tiara", 1, Decimal::MAX).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = apply_stock_movement(&db, "RING-9", i64::MIN, StockMovementKind::Adjustment, "typo")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let totals = get_invoice_totals(&db, &number).await.unwrap();
        assert_eq!(totals.total, dec("50.00"));
        assert_eq!(get_product(&db, "RING-9").await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_stock_errors_map_to_codes() {
        let db = state().await;
        ring(&db, "RING-2", 1, "50").await;

        let err = apply_stock_movement(&db, "RING-2", -2, StockMovementKind::Sale, "counter")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = apply_stock_movement(&db, "NOPE", 1, StockMovementKind::Restock, "delivery")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let moved = apply_stock_movement(&db, "RING-2", 4, StockMovementKind::Restock, "delivery")
            .await
            .unwrap();
        assert_eq!(moved.resulting_quantity, 5);
    }

    #[tokio::test]
    async fn test_share_link_round_trip() {
        let db = state().await;
        let config = AppConfig::default();
        let created = create_invoice(&db, None, Some("gift")).await.unwrap();

        let link = issue_share_token(&db, &config, &created.invoice.number).await.unwrap();
        assert_eq!(link.invoice_number, created.invoice.number);
        assert!(link.expires_at > Utc::now());

        let opened = open_shared_invoice(&db, &config, &link.token).await.unwrap();
        assert_eq!(opened.invoice.id, created.invoice.id);

        let err = open_shared_invoice(&db, &config, "0000").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_allocate_number_for_explicit_period() {
        let db = state().await;
        let first = allocate_invoice_number(&db, Some("2026-03")).await.unwrap();
        let second = allocate_invoice_number(&db, Some("2026-03")).await.unwrap();

        assert_eq!(first.number, "LZR-2026-03-0001");
        assert_eq!(second.number, "LZR-2026-03-0002");
        assert!(allocate_invoice_number(&db, Some("2026-13")).await.is_err());
    }
}
