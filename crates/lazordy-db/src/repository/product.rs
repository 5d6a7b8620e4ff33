//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Insert with an opening stock movement
//! - Lookups by id and item code, search
//! - Catalog edits (never quantity; that goes through the stock ledger)
//! - Soft delete, low-stock listing

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::stock::apply_in_tx;
use lazordy_core::validation::{
    validate_item_code, validate_name, validate_price_cents, validate_stock_level,
};
use lazordy_core::{
    NewProduct, Product, ProductUpdate, StockMovementKind, DEFAULT_LOW_STOCK_THRESHOLD,
};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let ring = repo.get_by_item_code("RING-0042").await?;
/// let running_low = repo.low_stock(20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// The row starts at zero and the opening quantity, if any, is booked as
    /// a `restock` entry in the same transaction, so the ledger always
    /// explains the full quantity.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - item code already exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_item_code(&new.item_code)?;
        validate_name("name", &new.name)?;
        validate_price_cents(new.price_cents)?;
        if let Some(cost) = new.cost_cents {
            validate_price_cents(cost)?;
        }
        validate_stock_level("opening_quantity", new.opening_quantity)?;
        let threshold = new.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        validate_stock_level("low_stock_threshold", threshold)?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let item_code = new.item_code.trim().to_string();

        debug!(item_code = %item_code, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, item_code, name, description,
                price_cents, cost_cents, quantity, low_stock_threshold,
                is_active, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, 1, ?8, ?8, 0)
            "#,
        )
        .bind(&id)
        .bind(&item_code)
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.price_cents)
        .bind(new.cost_cents)
        .bind(threshold)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &item_code),
            other => other,
        })?;

        if new.opening_quantity > 0 {
            apply_in_tx(
                &mut tx,
                &id,
                new.opening_quantity,
                StockMovementKind::Restock,
                "opening stock",
                None,
                None,
            )
            .await?;
        }

        let product = fetch_by_id(&mut tx, &id).await?;
        tx.commit().await?;

        info!(id = %product.id, item_code = %product.item_code, quantity = product.quantity, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID (active or not).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its item code.
    pub async fn get_by_item_code(&self, item_code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE item_code = ?1")
            .bind(item_code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Searches active products by item code or name (case-insensitive
    /// substring). An empty query lists active products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1
              AND (item_code LIKE ?1 ESCAPE '\' OR name LIKE ?1 ESCAPE '\')
            ORDER BY
                CASE WHEN item_code LIKE ?1 ESCAPE '\' THEN 0 ELSE 1 END,
                name
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Counts catalog rows, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Active products at or below their low-stock threshold, emptiest first.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1 AND quantity <= low_stock_threshold
            ORDER BY quantity, name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates catalog details. Fields left `None` keep their value.
    pub async fn update(&self, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        if let Some(name) = &changes.name {
            validate_name("name", name)?;
        }
        if let Some(price) = changes.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(cost) = changes.cost_cents {
            validate_price_cents(cost)?;
        }
        if let Some(threshold) = changes.low_stock_threshold {
            validate_stock_level("low_stock_threshold", threshold)?;
        }

        debug!(id = %id, "Updating product");

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                price_cents = COALESCE(?4, price_cents),
                cost_cents = COALESCE(?5, cost_cents),
                low_stock_threshold = COALESCE(?6, low_stock_threshold),
                updated_at = ?7,
                version = version + 1
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.description)
        .bind(changes.price_cents)
        .bind(changes.cost_cents)
        .bind(changes.low_stock_threshold)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        Ok(product)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Old invoices keep pointing at the row, and removing one of their
    /// lines can still return stock to it.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2, version = version + 1
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }
}

/// Reads a product on an open transaction.
pub(crate) async fn fetch_by_id(
    conn: &mut sqlx::SqliteConnection,
    id: &str,
) -> DbResult<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::test_support::{memory_db, new_product, product};
    use lazordy_core::{CoreError, ProductUpdate, StockAvailability};

    #[tokio::test]
    async fn test_insert_records_opening_stock() {
        let db = memory_db().await;
        let p = product(&db, "NK-1", 4).await;

        assert_eq!(p.quantity, 4);
        assert!(p.is_active);
        assert_eq!(p.availability(), StockAvailability::InStock);

        let history = db.stock().history(&p.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, "opening stock");
        assert_eq!(history[0].resulting_quantity, 4);
    }

    #[tokio::test]
    async fn test_duplicate_item_code() {
        let db = memory_db().await;
        product(&db, "NK-2", 1).await;

        let err = db.products().insert(&new_product("NK-2", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { value, .. } if value == "NK-2"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let db = memory_db().await;
        let mut bad = new_product("has space", 1);
        assert!(matches!(
            db.products().insert(&bad).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));

        bad.item_code = "OK-1".to_string();
        bad.price_cents = -1;
        assert!(db.products().insert(&bad).await.is_err());
    }

    #[tokio::test]
    async fn test_update_search_and_soft_delete() {
        let db = memory_db().await;
        let p = product(&db, "BR-10", 0).await;
        let repo = db.products();

        let updated = repo
            .update(
                &p.id,
                &ProductUpdate {
                    name: Some("Silver bracelet".to_string()),
                    price_cents: Some(45000),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Silver bracelet");
        assert_eq!(updated.price_cents, 45000);
        assert_eq!(updated.quantity, 0);
        assert_eq!(updated.version, p.version + 1);

        assert_eq!(repo.search("silver", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("br-1", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("%", 10).await.unwrap().len(), 0);

        repo.soft_delete(&p.id).await.unwrap();
        assert!(repo.search("silver", 10).await.unwrap().is_empty());
        assert!(repo.get_by_id(&p.id).await.unwrap().is_some());
        assert!(repo.soft_delete(&p.id).await.is_err());
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = memory_db().await;
        product(&db, "LOW-0", 0).await;
        product(&db, "LOW-1", 1).await;
        product(&db, "OK-5", 5).await;

        assert_eq!(db.products().count().await.unwrap(), 3);
        let low = db.products().low_stock(10).await.unwrap();
        let codes: Vec<_> = low.iter().map(|p| p.item_code.as_str()).collect();
        assert_eq!(codes, vec!["LOW-0", "LOW-1"]);
        assert_eq!(low[0].availability(), StockAvailability::OutOfStock);
        assert_eq!(low[1].availability(), StockAvailability::LowStock);
    }
}
