//! # Product Commands
//!
//! Catalog lookups and product creation.
//!
//! Operators refer to products by item code; other callers may pass the
//! UUID. [`find_product`] accepts either.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use lazordy_core::{Money, NewProduct, Product, StockAvailability};

/// Product DTO for callers of the back office.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub item_code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i64,
    pub availability: StockAvailability,
    pub is_active: bool,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        let availability = p.availability();
        ProductDto {
            price: p.price().to_decimal(),
            id: p.id,
            item_code: p.item_code,
            name: p.name,
            description: p.description,
            quantity: p.quantity,
            availability,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub item_code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub opening_quantity: i64,
    pub low_stock_threshold: Option<i64>,
}

/// Adds a product. The opening quantity is booked as a restock.
pub async fn create_product(
    db: &DbState,
    request: CreateProductRequest,
) -> Result<ProductDto, ApiError> {
    debug!(item_code = %request.item_code, "create_product command");

    let new = NewProduct {
        item_code: request.item_code,
        name: request.name,
        description: request.description,
        price_cents: Money::from_decimal(request.price)?.cents(),
        cost_cents: request
            .cost
            .map(Money::from_decimal)
            .transpose()?
            .map(|m| m.cents()),
        opening_quantity: request.opening_quantity,
        low_stock_threshold: request.low_stock_threshold,
    };

    let product = db.inner().products().insert(&new).await?;
    Ok(ProductDto::from(product))
}

/// Looks a product up by item code, then by id.
pub async fn find_product(db: &DbState, key: &str) -> Result<Product, ApiError> {
    let products = db.inner().products();

    if let Some(product) = products.get_by_item_code(key).await? {
        return Ok(product);
    }
    products
        .get_by_id(key)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", key))
}

pub async fn get_product(db: &DbState, key: &str) -> Result<ProductDto, ApiError> {
    debug!(key = %key, "get_product command");
    Ok(ProductDto::from(find_product(db, key).await?))
}

/// Searches item codes and names.
///
/// ## Arguments
/// * `limit` - Maximum results to return (default: 20, max: 100)
pub async fn search_products(
    db: &DbState,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<ProductDto>, ApiError> {
    let start = Instant::now();
    let limit = limit.unwrap_or(20).min(100);

    let products = db.inner().products().search(query, limit).await?;
    let dtos: Vec<ProductDto> = products.into_iter().map(ProductDto::from).collect();

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        query = %query.trim(),
        "search_products complete"
    );
    Ok(dtos)
}

/// Active products at or below their low-stock threshold.
pub async fn low_stock_products(db: &DbState, limit: Option<u32>) -> Result<Vec<ProductDto>, ApiError> {
    let products = db
        .inner()
        .products()
        .low_stock(limit.unwrap_or(50).min(500))
        .await?;
    Ok(products.into_iter().map(ProductDto::from).collect())
}
