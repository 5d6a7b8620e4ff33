//! # Stock Ledger
//!
//! Applies signed quantity deltas to products and records every movement.
//!
//! ## One Movement, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├─► UPDATE products SET quantity = quantity + Δ                      │
//! │   │     WHERE id = ? AND quantity + Δ >= 0                             │
//! │   │     RETURNING quantity            ← takes the write lock           │
//! │   │                                                                     │
//! │   │   no row? ──► SELECT quantity ──► ProductNotFound                  │
//! │   │                                    or InsufficientStock            │
//! │   │                                    (ROLLBACK, nothing applied)     │
//! │   │                                                                     │
//! │   └─► INSERT INTO stock_ledger (..., resulting_quantity)               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The check and the update are one statement, so two sellers racing for
//! the last unit can never both succeed. Invoice mutations call
//! [`apply_in_tx`] inside their own transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use lazordy_core::stock;
use lazordy_core::validation::{validate_quantity, validate_reason};
use lazordy_core::{CoreError, StockLedgerEntry, StockMovementKind};

/// Repository for stock movements.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Applies a signed delta to a product's quantity and records it.
    ///
    /// ## Errors
    /// - `Validation` - zero delta, or a sign the kind does not allow
    /// - `ProductNotFound`
    /// - `InsufficientStock` - the product quantity is left untouched
    pub async fn apply(
        &self,
        product_id: &str,
        delta: i64,
        kind: StockMovementKind,
        reason: &str,
        reference: Option<&str>,
    ) -> DbResult<StockLedgerEntry> {
        debug!(product_id = %product_id, delta, kind = %kind, "Applying stock movement");

        let mut tx = self.pool.begin().await?;
        let entry = apply_in_tx(&mut tx, product_id, delta, kind, reason, reference, None).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            delta,
            kind = %kind,
            resulting_quantity = entry.resulting_quantity,
            "Stock movement committed"
        );
        Ok(entry)
    }

    /// Convenience wrapper for receiving goods.
    pub async fn restock(
        &self,
        product_id: &str,
        quantity: i64,
        reason: &str,
    ) -> DbResult<StockLedgerEntry> {
        validate_quantity(quantity)?;
        self.apply(product_id, quantity, StockMovementKind::Restock, reason, None)
            .await
    }

    /// Undoes a ledger entry with a new offsetting `adjustment`.
    ///
    /// ## Errors
    /// - `NotFound` - no such entry
    /// - `AlreadyReversed` - the entry was reversed before
    /// - `InsufficientStock` - undoing a restock whose units were sold since
    pub async fn reverse(&self, entry_id: &str, reason: &str) -> DbResult<StockLedgerEntry> {
        // Entries are immutable, so reading outside the write transaction is safe.
        let original = self
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock ledger entry", entry_id))?;

        if self.reversal_of(entry_id).await?.is_some() {
            return Err(CoreError::AlreadyReversed(entry_id.to_string()).into());
        }

        let mut tx = self.pool.begin().await?;
        let entry = apply_in_tx(
            &mut tx,
            &original.product_id,
            stock::reversal_delta(&original),
            StockMovementKind::Adjustment,
            reason,
            original.reference.as_deref(),
            Some(entry_id),
        )
        .await
        .map_err(|e| {
            // a concurrent reversal won the race for the unique index
            if e.is_unique_violation_on("stock_ledger.reverses_entry_id") {
                DbError::Domain(CoreError::AlreadyReversed(entry_id.to_string()))
            } else {
                e
            }
        })?;
        tx.commit().await?;

        info!(entry_id = %entry_id, reversal_id = %entry.id, "Stock movement reversed");
        Ok(entry)
    }

    /// Dry-run: can `quantity` units leave stock right now? No writes.
    pub async fn check_available(&self, product_id: &str, quantity: i64) -> DbResult<()> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT item_code, quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        let (item_code, available) =
            row.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        stock::check_available(&item_code, available, quantity)?;
        Ok(())
    }

    pub async fn get_entry(&self, entry_id: &str) -> DbResult<Option<StockLedgerEntry>> {
        let entry = sqlx::query_as::<_, StockLedgerEntry>("SELECT * FROM stock_ledger WHERE id = ?1")
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn reversal_of(&self, entry_id: &str) -> DbResult<Option<StockLedgerEntry>> {
        let entry = sqlx::query_as::<_, StockLedgerEntry>(
            "SELECT * FROM stock_ledger WHERE reverses_entry_id = ?1",
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    /// Ledger entries for a product, newest first.
    pub async fn history(&self, product_id: &str, limit: u32) -> DbResult<Vec<StockLedgerEntry>> {
        let entries = sqlx::query_as::<_, StockLedgerEntry>(
            r#"
            SELECT * FROM stock_ledger
            WHERE product_id = ?1
            ORDER BY rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Entries carrying the given reference (usually an invoice id), oldest first.
    pub async fn by_reference(&self, reference: &str) -> DbResult<Vec<StockLedgerEntry>> {
        let entries = sqlx::query_as::<_, StockLedgerEntry>(
            "SELECT * FROM stock_ledger WHERE reference = ?1 ORDER BY rowid",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

/// Applies one movement on an open transaction. The conditional `UPDATE` is
/// the first write, so the caller's transaction holds the write lock from
/// here until it commits or rolls back.
pub(crate) async fn apply_in_tx(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
    kind: StockMovementKind,
    reason: &str,
    reference: Option<&str>,
    reverses_entry_id: Option<&str>,
) -> DbResult<StockLedgerEntry> {
    stock::validate_movement(kind, delta)?;
    validate_reason(reason)?;

    let now = Utc::now();

    let resulting: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET quantity = quantity + ?2,
            updated_at = ?3,
            version = version + 1
        WHERE id = ?1 AND quantity + ?2 >= 0
        RETURNING quantity
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let resulting_quantity = match resulting {
        Some(quantity) => quantity,
        None => return Err(rejection(conn, product_id, delta).await),
    };

    let entry = StockLedgerEntry {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        delta,
        kind,
        reason: reason.to_string(),
        reference: reference.map(str::to_string),
        reverses_entry_id: reverses_entry_id.map(str::to_string),
        resulting_quantity,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_ledger (
            id, product_id, delta, kind, reason,
            reference, reverses_entry_id, resulting_quantity, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.product_id)
    .bind(entry.delta)
    .bind(entry.kind)
    .bind(&entry.reason)
    .bind(&entry.reference)
    .bind(&entry.reverses_entry_id)
    .bind(entry.resulting_quantity)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(entry)
}

/// Explains why the conditional update matched nothing.
async fn rejection(conn: &mut SqliteConnection, product_id: &str, delta: i64) -> DbError {
    let row: Result<Option<(String, i64)>, sqlx::Error> =
        sqlx::query_as("SELECT item_code, quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await;

    match row {
        Ok(None) => CoreError::ProductNotFound(product_id.to_string()).into(),
        Ok(Some((item_code, available))) => match stock::apply_delta(&item_code, available, delta) {
            Err(err) => err.into(),
            // We hold the write lock, so the row cannot have changed since the UPDATE.
            Ok(_) => CoreError::concurrent("product", product_id).into(),
        },
        Err(err) => err.into(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::test_support::{file_db, memory_db, product};
    use lazordy_core::{CoreError, StockMovementKind};
    use proptest::prelude::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    use crate::error::DbError;

    #[tokio::test]
    async fn test_ledger_scenario() {
        let db = memory_db().await;
        let p = product(&db, "RING-1", 10).await;
        let ledger = db.stock();

        let e = ledger
            .apply(&p.id, -3, StockMovementKind::Sale, "walk-in", None)
            .await
            .unwrap();
        assert_eq!(e.resulting_quantity, 7);

        let e = ledger
            .apply(&p.id, -2, StockMovementKind::Sale, "walk-in", None)
            .await
            .unwrap();
        assert_eq!(e.resulting_quantity, 5);

        let e = ledger
            .apply(&p.id, 3, StockMovementKind::Adjustment, "customer return", None)
            .await
            .unwrap();
        assert_eq!(e.resulting_quantity, 8);

        let reloaded = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(reloaded.quantity, 8);

        // opening restock + three movements
        let history = ledger.history(&p.id, 10).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].delta, 3);
    }

    #[tokio::test]
    async fn test_over_deduction_is_rejected_and_nothing_applied() {
        let db = memory_db().await;
        let p = product(&db, "RING-2", 2).await;

        let err = db
            .stock()
            .apply(&p.id, -5, StockMovementKind::Sale, "walk-in", None)
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let reloaded = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(reloaded.quantity, 2);
        assert_eq!(db.stock().history(&p.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sign_rules_and_missing_product() {
        let db = memory_db().await;
        let p = product(&db, "RING-3", 5).await;
        let ledger = db.stock();

        assert!(matches!(
            ledger.apply(&p.id, 0, StockMovementKind::Adjustment, "", None).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(matches!(
            ledger.apply(&p.id, -1, StockMovementKind::Restock, "", None).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(matches!(
            ledger.apply("missing", 1, StockMovementKind::Restock, "", None).await,
            Err(DbError::Domain(CoreError::ProductNotFound(_)))
        ));
        assert!(ledger.check_available(&p.id, 5).await.is_ok());
        assert!(ledger.check_available(&p.id, 6).await.is_err());
    }

    #[tokio::test]
    async fn test_reverse_once() {
        let db = memory_db().await;
        let p = product(&db, "RING-4", 4).await;
        let ledger = db.stock();

        let sale = ledger
            .apply(&p.id, -3, StockMovementKind::Sale, "walk-in", Some("inv-1"))
            .await
            .unwrap();
        let reversal = ledger.reverse(&sale.id, "entered twice").await.unwrap();

        assert_eq!(reversal.delta, 3);
        assert_eq!(reversal.kind, StockMovementKind::Adjustment);
        assert_eq!(reversal.reverses_entry_id.as_deref(), Some(sale.id.as_str()));
        assert_eq!(reversal.resulting_quantity, 4);

        assert!(matches!(
            ledger.reverse(&sale.id, "again").await,
            Err(DbError::Domain(CoreError::AlreadyReversed(_)))
        ));
        assert_eq!(ledger.by_reference("inv-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reversing_sold_restock_fails() {
        let db = memory_db().await;
        let p = product(&db, "RING-5", 0).await;
        let ledger = db.stock();

        let restock = ledger.restock(&p.id, 2, "delivery").await.unwrap();
        ledger
            .apply(&p.id, -2, StockMovementKind::Sale, "walk-in", None)
            .await
            .unwrap();

        assert!(matches!(
            ledger.reverse(&restock.id, "wrong delivery").await,
            Err(DbError::Domain(CoreError::InsufficientStock { .. }))
        ));
    }

    /// Random movement sequences through the real UPDATE: quantity never goes
    /// negative, and a rejected movement leaves quantity and ledger untouched.
    #[tokio::test]
    async fn test_random_movements_never_go_negative() {
        let mut runner = TestRunner::deterministic();
        let movements = prop::collection::vec(prop_oneof![-6i64..=-1, 1i64..=6], 40..80);

        for round in 0..4 {
            let db = memory_db().await;
            let p = product(&db, &format!("RING-R{round}"), 3).await;
            let ledger = db.stock();
            let deltas = movements.new_tree(&mut runner).unwrap().current();

            let mut expected = 3;
            let mut rows = ledger.history(&p.id, 1000).await.unwrap().len();

            for (i, delta) in deltas.into_iter().enumerate() {
                let kind = match (delta > 0, i % 2 == 0) {
                    (true, true) => StockMovementKind::Restock,
                    (false, true) => StockMovementKind::Sale,
                    _ => StockMovementKind::Adjustment,
                };

                match ledger.apply(&p.id, delta, kind, "shuffle", None).await {
                    Ok(entry) => {
                        expected += delta;
                        rows += 1;
                        assert_eq!(entry.resulting_quantity, expected);
                    }
                    Err(DbError::Domain(CoreError::InsufficientStock {
                        available,
                        requested,
                        ..
                    })) => {
                        assert!(expected + delta < 0);
                        assert_eq!((available, requested), (expected, -delta));
                    }
                    Err(other) => panic!("unexpected error: {other:?}"),
                }

                let stored = db.products().get_by_id(&p.id).await.unwrap().unwrap();
                assert_eq!(stored.quantity, expected);
                assert!(stored.quantity >= 0);
                assert_eq!(ledger.history(&p.id, 1000).await.unwrap().len(), rows);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_of_last_units() {
        const N: i64 = 8;
        let (db, _dir) = file_db().await;
        let p = product(&db, "RING-6", N - 1).await;

        let mut handles = Vec::new();
        for _ in 0..N {
            let ledger = db.stock();
            let id = p.id.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .apply(&id, -1, StockMovementKind::Sale, "rush", None)
                    .await
            }));
        }

        let mut ok = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => insufficient += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ok, N - 1);
        assert_eq!(insufficient, 1);
        let reloaded = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(reloaded.quantity, 0);
    }
}
