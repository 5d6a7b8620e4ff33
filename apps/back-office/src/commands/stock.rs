//! # Stock Commands
//!
//! Direct stock movements: receiving goods, counter sales outside an
//! invoice, corrections and reversals. Invoice lines move stock through
//! `mutate_invoice_items` instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::product::find_product;
use crate::error::ApiError;
use crate::state::DbState;
use lazordy_core::{StockLedgerEntry, StockMovementKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementDto {
    pub entry_id: String,
    pub product_id: String,
    pub delta: i64,
    pub kind: StockMovementKind,
    pub reason: String,
    pub reference: Option<String>,
    pub reverses_entry_id: Option<String>,
    pub resulting_quantity: i64,
    pub created_at: String,
}

impl From<StockLedgerEntry> for StockMovementDto {
    fn from(e: StockLedgerEntry) -> Self {
        StockMovementDto {
            entry_id: e.id,
            product_id: e.product_id,
            delta: e.delta,
            kind: e.kind,
            reason: e.reason,
            reference: e.reference,
            reverses_entry_id: e.reverses_entry_id,
            resulting_quantity: e.resulting_quantity,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// Applies a signed quantity change to a product.
///
/// `product` is an item code or product id. Restocks must add, sales must
/// remove; adjustments go either way. Over-deduction fails with
/// `INSUFFICIENT_STOCK` and leaves the quantity untouched.
pub async fn apply_stock_movement(
    db: &DbState,
    product: &str,
    delta: i64,
    kind: StockMovementKind,
    reason: &str,
) -> Result<StockMovementDto, ApiError> {
    debug!(product = %product, delta, kind = %kind, "apply_stock_movement command");

    let product = find_product(db, product).await?;
    let entry = db
        .inner()
        .stock()
        .apply(&product.id, delta, kind, reason, None)
        .await?;
    Ok(StockMovementDto::from(entry))
}

pub async fn restock(
    db: &DbState,
    product: &str,
    quantity: i64,
    reason: &str,
) -> Result<StockMovementDto, ApiError> {
    let product = find_product(db, product).await?;
    let entry = db.inner().stock().restock(&product.id, quantity, reason).await?;
    Ok(StockMovementDto::from(entry))
}

/// Offsets an earlier movement. Each entry can be reversed once.
pub async fn reverse_stock_movement(
    db: &DbState,
    entry_id: &str,
    reason: &str,
) -> Result<StockMovementDto, ApiError> {
    debug!(entry_id = %entry_id, "reverse_stock_movement command");
    let entry = db.inner().stock().reverse(entry_id, reason).await?;
    Ok(StockMovementDto::from(entry))
}

/// Newest movements first.
pub async fn stock_history(
    db: &DbState,
    product: &str,
    limit: Option<u32>,
) -> Result<Vec<StockMovementDto>, ApiError> {
    let product = find_product(db, product).await?;
    let entries = db
        .inner()
        .stock()
        .history(&product.id, limit.unwrap_or(50).min(500))
        .await?;
    Ok(entries.into_iter().map(StockMovementDto::from).collect())
}
