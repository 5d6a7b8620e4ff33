//! # Invoice Repository
//!
//! Invoice headers, line items, and every mutation that has to keep stock
//! and totals in step.
//!
//! ## Mutation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├─► UPDATE invoices SET version = version + 1                        │
//! │   │     WHERE id = ? [AND version = expected] RETURNING *              │
//! │   │     ← write lock taken here, later reads cannot go stale           │
//! │   │                                                                     │
//! │   ├─► sticky status? ──► InvalidInvoiceStatus                          │
//! │   │                                                                     │
//! │   ├─► line item change + stock ledger movement                         │
//! │   │                                                                     │
//! │   ├─► calculate_totals over the lines (once)                           │
//! │   │                                                                     │
//! │   └─► UPDATE invoices SET <totals, status>                             │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error drops the transaction, which rolls back the line, the stock
//! movement and the version bump together.

use chrono::{Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_by_id;
use crate::repository::sequence::SequenceAllocator;
use crate::repository::stock::apply_in_tx;
use lazordy_core::stock::{check_available, line_quantity_movement};
use lazordy_core::totals::{calculate_totals, settle, LineAmount, StatusState};
use lazordy_core::validation::{
    validate_discount_cents, validate_name, validate_payment_amount, validate_price_cents,
    validate_quantity, validate_reason,
};
use lazordy_core::{
    BestSeller, CoreError, Invoice, InvoiceItemOp, InvoiceLineItem, InvoicePeriod,
    InvoiceStatus, InvoiceTotals, LineItemSource, Money, NewLineItem, PaymentMethod,
    StatusSource, StockMovementKind,
};

/// A new invoice, plus the numbering warning if the fallback number was used.
#[derive(Debug, Clone)]
pub struct CreatedInvoice {
    pub invoice: Invoice,
    pub warning: Option<CoreError>,
}

/// Repository for invoices and their line items.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    sequences: SequenceAllocator,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool, sequences: SequenceAllocator) -> Self {
        InvoiceRepository { pool, sequences }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates a draft invoice numbered for the current month.
    ///
    /// The number is reserved first (committed on its own), then claimed by
    /// the insert. A UNIQUE conflict on the insert reserves the next one.
    pub async fn create(
        &self,
        customer_id: Option<&str>,
        notes: Option<&str>,
    ) -> DbResult<CreatedInvoice> {
        if let Some(customer_id) = customer_id {
            let known: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE id = ?1)")
                    .bind(customer_id)
                    .fetch_one(&self.pool)
                    .await?;
            if !known {
                return Err(DbError::not_found("Customer", customer_id));
            }
        }

        let period = InvoicePeriod::containing(Utc::now());
        let mut last = String::new();

        for attempt in 1..=self.sequences.max_attempts() {
            let number = self.sequences.reserve(period).await?.to_string();

            match self.insert_header(&number, customer_id, notes).await {
                Ok(invoice) => {
                    info!(id = %invoice.id, number = %invoice.number, "Invoice created");
                    return Ok(CreatedInvoice {
                        invoice,
                        warning: None,
                    });
                }
                Err(e) if e.is_unique_violation_on("invoices.number") => {
                    debug!(number = %number, attempt, "Invoice number taken, reserving another");
                    last = number;
                }
                Err(e) => return Err(e),
            }
        }

        let allocation = self.sequences.fallback(&last);
        let invoice = self
            .insert_header(&allocation.number, customer_id, notes)
            .await?;

        info!(id = %invoice.id, number = %invoice.number, "Invoice created with fallback number");
        Ok(CreatedInvoice {
            invoice,
            warning: allocation.warning,
        })
    }

    async fn insert_header(
        &self,
        number: &str,
        customer_id: Option<&str>,
        notes: Option<&str>,
    ) -> DbResult<Invoice> {
        let now = Utc::now();
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                id, number, customer_id, status, status_source, notes,
                created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, 'draft', 'derived', ?4, ?5, ?5, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(number)
        .bind(customer_id)
        .bind(notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(invoice)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE number = ?1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    /// Newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<InvoiceStatus>, limit: u32) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    /// Line items in the order they were added.
    pub async fn items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLineItem>> {
        let mut conn = self.pool.acquire().await?;
        load_items(&mut conn, invoice_id).await
    }

    /// Recomputes totals from the stored lines. Never trusts the stored
    /// derived columns and never writes.
    pub async fn totals(&self, invoice_id: &str) -> DbResult<InvoiceTotals> {
        let invoice = self
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;
        let items = self.items(invoice_id).await?;
        Ok(compute(&invoice, &items))
    }

    // =========================================================================
    // Line Item Mutation
    // =========================================================================

    /// Adds, re-quantifies or removes a line, moves stock to match, and
    /// recomputes the invoice, all in one transaction.
    ///
    /// ## Errors
    /// - `InvoiceNotFound`, `LineItemNotFound`, `ProductNotFound`
    /// - `InvalidLineItem` - custom line without a name or positive price
    /// - `InsufficientStock` - nothing is applied
    /// - `InvalidInvoiceStatus` - settled invoice, or a cancelled invoice for
    ///   anything but `Remove`
    /// - `ConcurrentModification` - `expected_version` is stale
    pub async fn mutate_items(
        &self,
        invoice_id: &str,
        op: &InvoiceItemOp,
        expected_version: Option<i64>,
    ) -> DbResult<InvoiceTotals> {
        debug!(invoice_id = %invoice_id, ?op, "Mutating invoice items");

        let mut tx = self.pool.begin().await?;
        let invoice = claim(&mut tx, invoice_id, expected_version).await?;
        match op {
            // removing a line from a cancelled invoice puts its goods back on the shelf
            InvoiceItemOp::Remove { .. } if invoice.status == InvoiceStatus::Cancelled => {}
            _ => ensure_unlocked(&invoice)?,
        }

        match op {
            InvoiceItemOp::Add(new) => add_line(&mut tx, &invoice, new).await?,
            InvoiceItemOp::UpdateQuantity { item_id, quantity } => {
                update_line_quantity(&mut tx, &invoice, item_id, *quantity).await?
            }
            InvoiceItemOp::Remove { item_id } => remove_line(&mut tx, &invoice, item_id).await?,
        }

        let totals = recompute_and_save(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(
            invoice = %invoice.number,
            subtotal = %totals.subtotal,
            total = %totals.total,
            remaining = %totals.amount_remaining,
            status = %totals.status.status,
            "Invoice items updated"
        );
        Ok(totals)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Sets both discounts (absolute amounts) and recomputes.
    pub async fn set_discounts(
        &self,
        invoice_id: &str,
        discount: Money,
        manager_discount: Money,
        reason: Option<&str>,
        expected_version: Option<i64>,
    ) -> DbResult<InvoiceTotals> {
        validate_discount_cents("discount", discount.cents())?;
        validate_discount_cents("manager_discount", manager_discount.cents())?;
        if let Some(reason) = reason {
            validate_reason(reason)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut invoice = claim(&mut tx, invoice_id, expected_version).await?;
        ensure_unlocked(&invoice)?;

        invoice.discount_cents = discount.cents();
        invoice.manager_discount_cents = manager_discount.cents();
        invoice.manager_discount_reason = reason.map(str::to_string);

        let totals = recompute_and_save(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(
            invoice = %invoice.number,
            discount = %discount,
            manager_discount = %manager_discount,
            total = %totals.total,
            "Invoice discounts set"
        );
        Ok(totals)
    }

    /// Records a payment. Overpayment is clamped to the total. When nothing
    /// remains the invoice becomes a settled (sticky) `paid`.
    pub async fn settle_payment(
        &self,
        invoice_id: &str,
        amount: Money,
        method: PaymentMethod,
        expected_version: Option<i64>,
    ) -> DbResult<InvoiceTotals> {
        validate_payment_amount(amount.cents())?;

        let mut tx = self.pool.begin().await?;
        let mut invoice = claim(&mut tx, invoice_id, expected_version).await?;
        ensure_unlocked(&invoice)?;

        invoice.amount_paid_cents = invoice.amount_paid().saturating_add(amount).cents();
        invoice.payment_method = Some(method);

        let items = load_items(&mut tx, &invoice.id).await?;
        let totals = settle(compute(&invoice, &items));
        save(&mut tx, &invoice, &totals).await?;
        tx.commit().await?;

        info!(
            invoice = %invoice.number,
            amount = %amount,
            method = ?method,
            paid = %totals.amount_paid,
            remaining = %totals.amount_remaining,
            status = %totals.status.status,
            "Payment recorded"
        );
        Ok(totals)
    }

    /// Cancels an invoice. Stock is not restored here; removing the lines,
    /// before or after cancelling, returns the goods to the shelf.
    pub async fn cancel(
        &self,
        invoice_id: &str,
        expected_version: Option<i64>,
    ) -> DbResult<InvoiceTotals> {
        let mut tx = self.pool.begin().await?;
        let mut invoice = claim(&mut tx, invoice_id, expected_version).await?;

        if invoice.status == InvoiceStatus::Cancelled {
            return Err(invalid_status(&invoice));
        }

        invoice.status = InvoiceStatus::Cancelled;
        invoice.status_source = StatusSource::Manual;

        let totals = recompute_and_save(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(invoice = %invoice.number, "Invoice cancelled");
        Ok(totals)
    }

    /// Issues a fresh share token, replacing any previous one.
    pub async fn issue_share_token(&self, invoice_id: &str) -> DbResult<Invoice> {
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET
                share_token = ?2,
                share_token_created_at = ?3,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(&token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;

        info!(invoice = %invoice.number, "Share token issued");
        Ok(invoice)
    }

    /// Looks up an invoice by share token, if the token has not expired.
    pub async fn find_by_share_token(&self, token: &str, ttl: Duration) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE share_token = ?1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice.filter(|inv| inv.share_token_valid_at(token, Utc::now(), ttl)))
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Units sold per product across non-cancelled invoices.
    pub async fn best_selling(&self, limit: u32) -> DbResult<Vec<BestSeller>> {
        let rows = sqlx::query_as::<_, BestSeller>(
            r#"
            SELECT
                p.id AS product_id,
                p.item_code AS item_code,
                p.name AS name,
                SUM(ii.quantity) AS units_sold
            FROM invoice_items ii
            JOIN invoices i ON i.id = ii.invoice_id
            JOIN products p ON p.id = ii.product_id
            WHERE i.status != 'cancelled'
            GROUP BY p.id, p.item_code, p.name
            ORDER BY units_sold DESC, p.name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Bumps the version and returns the row. Being the first write of the
/// transaction, this is where the write lock is taken.
async fn claim(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    expected_version: Option<i64>,
) -> DbResult<Invoice> {
    let claimed = sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE invoices SET version = version + 1
        WHERE id = ?1 AND (?2 IS NULL OR version = ?2)
        RETURNING *
        "#,
    )
    .bind(invoice_id)
    .bind(expected_version)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(invoice) = claimed {
        return Ok(invoice);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM invoices WHERE id = ?1)")
        .bind(invoice_id)
        .fetch_one(&mut *conn)
        .await?;

    if exists {
        Err(CoreError::concurrent("invoice", invoice_id).into())
    } else {
        Err(CoreError::InvoiceNotFound(invoice_id.to_string()).into())
    }
}

fn invalid_status(invoice: &Invoice) -> DbError {
    CoreError::InvalidInvoiceStatus {
        invoice_id: invoice.id.clone(),
        status: invoice.status.to_string(),
    }
    .into()
}

fn ensure_unlocked(invoice: &Invoice) -> DbResult<()> {
    if invoice.is_locked() {
        return Err(invalid_status(invoice));
    }
    Ok(())
}

async fn load_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceLineItem>> {
    let items = sqlx::query_as::<_, InvoiceLineItem>(
        "SELECT * FROM invoice_items WHERE invoice_id = ?1 ORDER BY rowid",
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

async fn load_item(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    item_id: &str,
) -> DbResult<InvoiceLineItem> {
    sqlx::query_as::<_, InvoiceLineItem>(
        "SELECT * FROM invoice_items WHERE id = ?1 AND invoice_id = ?2",
    )
    .bind(item_id)
    .bind(invoice_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        CoreError::LineItemNotFound {
            invoice_id: invoice_id.to_string(),
            item_id: item_id.to_string(),
        }
        .into()
    })
}

fn compute(invoice: &Invoice, items: &[InvoiceLineItem]) -> InvoiceTotals {
    let lines: Vec<LineAmount> = items.iter().map(LineAmount::from).collect();
    calculate_totals(
        &lines,
        invoice.discount(),
        invoice.manager_discount(),
        invoice.amount_paid(),
        StatusState {
            status: invoice.status,
            source: invoice.status_source,
        },
    )
}

async fn recompute_and_save(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<InvoiceTotals> {
    let items = load_items(conn, &invoice.id).await?;
    let totals = compute(invoice, &items);
    save(conn, invoice, &totals).await?;
    Ok(totals)
}

/// Writes the header fields an operation may change, with the calculator's
/// result replacing every derived column.
async fn save(conn: &mut SqliteConnection, invoice: &Invoice, totals: &InvoiceTotals) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE invoices SET
            discount_cents = ?2,
            manager_discount_cents = ?3,
            manager_discount_reason = ?4,
            amount_paid_cents = ?5,
            payment_method = ?6,
            status = ?7,
            status_source = ?8,
            subtotal_cents = ?9,
            total_cents = ?10,
            amount_remaining_cents = ?11,
            updated_at = ?12
        WHERE id = ?1
        "#,
    )
    .bind(&invoice.id)
    .bind(totals.discount.cents())
    .bind(totals.manager_discount.cents())
    .bind(&invoice.manager_discount_reason)
    .bind(totals.amount_paid.cents())
    .bind(invoice.payment_method)
    .bind(totals.status.status)
    .bind(totals.status.source)
    .bind(totals.subtotal.cents())
    .bind(totals.total.cents())
    .bind(totals.amount_remaining.cents())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &InvoiceLineItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, product_id, item_code_snapshot, name_snapshot,
            quantity, unit_price_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.invoice_id)
    .bind(&item.product_id)
    .bind(&item.item_code_snapshot)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn add_line(conn: &mut SqliteConnection, invoice: &Invoice, new: &NewLineItem) -> DbResult<()> {
    validate_quantity(new.quantity)?;
    if let Some(price) = new.unit_price_cents {
        validate_price_cents(price)?;
    }

    let item = match &new.source {
        LineItemSource::Product { product_id } => {
            let product = match fetch_by_id(conn, product_id).await {
                Ok(product) if product.is_active => product,
                Ok(_) | Err(DbError::NotFound { .. }) => {
                    return Err(CoreError::ProductNotFound(product_id.clone()).into())
                }
                Err(e) => return Err(e),
            };

            // zero or missing override means catalog price
            let unit_price_cents = new
                .unit_price_cents
                .filter(|price| *price > 0)
                .unwrap_or(product.price_cents);

            check_available(&product.item_code, product.quantity, new.quantity)?;

            InvoiceLineItem {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                product_id: Some(product.id),
                item_code_snapshot: Some(product.item_code),
                name_snapshot: product.name,
                quantity: new.quantity,
                unit_price_cents,
                created_at: Utc::now(),
            }
        }
        LineItemSource::Custom { name } => {
            if name.trim().is_empty() {
                return Err(CoreError::invalid_line_item("custom items need a name").into());
            }
            validate_name("name", name)?;

            let unit_price_cents = match new.unit_price_cents {
                Some(price) if price > 0 => price,
                _ => {
                    return Err(
                        CoreError::invalid_line_item("custom items need a positive price").into(),
                    )
                }
            };

            InvoiceLineItem {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                product_id: None,
                item_code_snapshot: None,
                name_snapshot: name.trim().to_string(),
                quantity: new.quantity,
                unit_price_cents,
                created_at: Utc::now(),
            }
        }
    };

    insert_item(conn, &item).await?;

    if let Some(product_id) = &item.product_id {
        apply_in_tx(
            conn,
            product_id,
            -item.quantity,
            StockMovementKind::Sale,
            &format!("invoice {}", invoice.number),
            Some(&invoice.id),
            None,
        )
        .await?;
    }

    debug!(invoice = %invoice.number, item_id = %item.id, "Line added");
    Ok(())
}

async fn update_line_quantity(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    item_id: &str,
    quantity: i64,
) -> DbResult<()> {
    validate_quantity(quantity)?;
    let item = load_item(conn, &invoice.id, item_id).await?;

    if let Some(product_id) = &item.product_id {
        if let Some((delta, kind)) = line_quantity_movement(item.quantity, quantity) {
            apply_in_tx(
                conn,
                product_id,
                delta,
                kind,
                &format!("invoice {} quantity {} -> {}", invoice.number, item.quantity, quantity),
                Some(&invoice.id),
                None,
            )
            .await?;
        }
    }

    sqlx::query("UPDATE invoice_items SET quantity = ?2 WHERE id = ?1")
        .bind(item_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    debug!(invoice = %invoice.number, item_id = %item_id, from = item.quantity, to = quantity, "Line quantity changed");
    Ok(())
}

async fn remove_line(conn: &mut SqliteConnection, invoice: &Invoice, item_id: &str) -> DbResult<()> {
    let item = load_item(conn, &invoice.id, item_id).await?;

    if let Some(product_id) = &item.product_id {
        apply_in_tx(
            conn,
            product_id,
            item.quantity,
            StockMovementKind::Adjustment,
            &format!("removed from invoice {}", invoice.number),
            Some(&invoice.id),
            None,
        )
        .await?;
    }

    sqlx::query("DELETE FROM invoice_items WHERE id = ?1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    debug!(invoice = %invoice.number, item_id = %item_id, "Line removed");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
