//! Shared fixtures for the repository tests.

use chrono::Utc;
use tempfile::TempDir;

use crate::pool::{Database, DbConfig};
use lazordy_core::{NewProduct, Product};

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A file-backed database, for tests that need several connections.
/// Keep the returned directory alive for the duration of the test.
pub(crate) async fn file_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("lazordy-test.db")).max_connections(8);
    (Database::new(config).await.unwrap(), dir)
}

pub(crate) fn new_product(item_code: &str, opening_quantity: i64) -> NewProduct {
    NewProduct {
        item_code: item_code.to_string(),
        name: format!("Item {item_code}"),
        description: None,
        price_cents: 10000,
        cost_cents: None,
        opening_quantity,
        low_stock_threshold: None,
    }
}

pub(crate) async fn product(db: &Database, item_code: &str, opening_quantity: i64) -> Product {
    db.products()
        .insert(&new_product(item_code, opening_quantity))
        .await
        .unwrap()
}

pub(crate) async fn priced_product(
    db: &Database,
    item_code: &str,
    opening_quantity: i64,
    price_cents: i64,
) -> Product {
    let mut new = new_product(item_code, opening_quantity);
    new.price_cents = price_cents;
    db.products().insert(&new).await.unwrap()
}

/// Writes an invoice row directly, bypassing the allocator.
pub(crate) async fn insert_raw_invoice(db: &Database, number: &str) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO invoices (id, number, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(number)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();
}
