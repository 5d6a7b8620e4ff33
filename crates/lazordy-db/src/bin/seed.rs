//! # Seed Data Generator
//!
//! Populates a development database with a jewellery catalog and a few
//! demo invoices.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p lazordy-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p lazordy-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p lazordy-db --bin seed -- --db ./data/lazordy.db
//! ```
//!
//! ## Generated Products
//! - Item code: `{CATEGORY}-{METAL}-{INDEX}`
//! - Price: 150.00 - 4,150.00, cost 55-75% of price
//! - Opening stock: 0 - 12, booked as a restock ledger entry

use std::env;

use lazordy_core::{InvoiceItemOp, LineItemSource, NewLineItem, NewProduct, PaymentMethod};
use lazordy_core::Money;
use lazordy_db::{Database, DbConfig};

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "RNG",
        &[
            "Solitaire Ring",
            "Eternity Band",
            "Signet Ring",
            "Halo Ring",
            "Twisted Band",
            "Stacking Ring",
        ],
    ),
    (
        "NCK",
        &[
            "Pendant Necklace",
            "Choker",
            "Rope Chain",
            "Locket",
            "Bar Necklace",
            "Name Necklace",
        ],
    ),
    (
        "BRC",
        &[
            "Tennis Bracelet",
            "Bangle",
            "Cuff",
            "Charm Bracelet",
            "Link Bracelet",
        ],
    ),
    (
        "EAR",
        &[
            "Stud Earrings",
            "Hoop Earrings",
            "Drop Earrings",
            "Huggies",
            "Ear Cuff",
        ],
    ),
];

/// Metals with their price add-on in cents
const METALS: &[(&str, &str, i64)] = &[
    ("SLV", "Silver", 0),
    ("G18", "18K Gold", 250_000),
    ("G21", "21K Gold", 310_000),
    ("WGD", "White Gold", 280_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./lazordy_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lazordy Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./lazordy_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Lazordy Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let mut stocked = Vec::new();
    let start = std::time::Instant::now();

    'outer: for (category_code, names) in CATEGORIES {
        for (name_idx, name) in names.iter().enumerate() {
            for (metal_idx, metal) in METALS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(category_code, name, metal, generated * 7 + name_idx + metal_idx);

                match db.products().insert(&product).await {
                    Ok(created) => {
                        if created.quantity > 2 {
                            stocked.push(created.id);
                        }
                    }
                    Err(e) => {
                        eprintln!("Failed to insert {}: {}", product.item_code, e);
                        continue;
                    }
                }

                generated += 1;
                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    // A few invoices so the reports have something to show
    println!();
    println!("Creating demo invoices...");
    for (n, product_id) in stocked.iter().take(3).enumerate() {
        let created = db.invoices().create(None, Some("seed data")).await?;
        let add = InvoiceItemOp::Add(NewLineItem {
            source: LineItemSource::Product {
                product_id: product_id.clone(),
            },
            quantity: 1,
            unit_price_cents: None,
        });
        let totals = db.invoices().mutate_items(&created.invoice.id, &add, None).await?;

        // first one settled, second half paid, third left as draft
        let payment = match n {
            0 => Some(totals.total),
            1 => Some(Money::from_cents(totals.total.cents() / 2)),
            _ => None,
        };
        if let Some(amount) = payment.filter(|a| a.is_positive()) {
            db.invoices()
                .settle_payment(&created.invoice.id, amount, PaymentMethod::Cash, None)
                .await?;
        }
        println!("  {} total {}", created.invoice.number, totals.total);
    }

    println!();
    let low = db.products().low_stock(100).await?;
    println!("  Low stock products: {}", low.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(category: &str, name: &str, metal: &(&str, &str, i64), seed: usize) -> NewProduct {
    let (metal_code, metal_name, price_addon) = *metal;

    let item_code = format!("{}-{}-{:04}", category, metal_code, seed);

    // Base 150.00 - 1,150.00 plus the metal add-on
    let price_cents = 15_000 + ((seed * 1_733) % 100_000) as i64 + price_addon;

    // Cost 55-75% of price
    let cost_pct = 55 + (seed % 21) as i64;
    let cost_cents = Some(price_cents * cost_pct / 100);

    NewProduct {
        item_code,
        name: format!("{} {}", metal_name, name),
        description: None,
        price_cents,
        cost_cents,
        opening_quantity: (seed % 13) as i64,
        low_stock_threshold: Some(2),
    }
}
