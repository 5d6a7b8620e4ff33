//! # Lazordy Operator CLI
//!
//! Command-line entry point over the back office commands. Results are
//! printed as JSON on stdout, errors as `{ code, message }` on stderr.
//!
//! ## Usage
//! ```bash
//! lazordy restock RING-0042 5 "supplier delivery"
//! lazordy invoice new --notes "walk-in"
//! lazordy invoice add LZR-2026-10-0001 RING-0042 1
//! lazordy invoice totals LZR-2026-10-0001
//! lazordy invoice pay LZR-2026-10-0001 1250.00 cash
//! lazordy next-number 2026-11
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr, `RUST_LOG`)
//! 2. Load configuration (`--config PATH` or the platform default)
//! 3. Connect to the database and run migrations
//! 4. Dispatch the command

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use lazordy_back_office::commands::{self, product::CreateProductRequest};
use lazordy_back_office::{start, ApiError, BackOffice};
use lazordy_core::{InvoiceItemOp, InvoiceStatus, PaymentMethod, StockMovementKind};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

fn usage(message: impl Into<String>) -> CliError {
    CliError::Usage(message.into())
}

#[tokio::main]
async fn main() -> ExitCode {
    lazordy_back_office::init_tracing();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    if let Some(pos) = args.iter().position(|a| a == "--config" || a == "-c") {
        if pos + 1 >= args.len() {
            eprintln!("--config needs a path");
            return ExitCode::from(2);
        }
        config_path = Some(PathBuf::from(args.remove(pos + 1)));
        args.remove(pos);
    }

    if args.is_empty() || matches!(args[0].as_str(), "--help" | "-h" | "help") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let office = match start(config_path.as_deref()).await {
        Ok(office) => office,
        Err(e) => {
            report(&e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&office, &args).await;
    office.db.inner().close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) => {
            eprintln!("{}", message);
            eprintln!();
            print_usage();
            ExitCode::from(2)
        }
        Err(CliError::Api(e)) => {
            report(&e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(office: &BackOffice, args: &[String]) -> Result<(), CliError> {
    let db = &office.db;
    let words: Vec<&str> = args.iter().map(String::as_str).collect();

    match words.as_slice() {
        // ---------------------------------------------------------------------
        // Numbering
        // ---------------------------------------------------------------------
        ["next-number"] => print_json(&commands::allocate_invoice_number(db, None).await?),
        ["next-number", period] => {
            print_json(&commands::allocate_invoice_number(db, Some(*period)).await?)
        }

        // ---------------------------------------------------------------------
        // Catalog
        // ---------------------------------------------------------------------
        ["product", "add", code, name, price, rest @ ..] => {
            let opening_quantity = match rest {
                [] => 0,
                [quantity] => parse_int(quantity, "opening quantity")?,
                _ => return Err(usage("product add takes at most one opening quantity")),
            };
            let request = CreateProductRequest {
                item_code: code.to_string(),
                name: name.to_string(),
                description: None,
                price: parse_amount(price)?,
                cost: None,
                opening_quantity,
                low_stock_threshold: None,
            };
            print_json(&commands::create_product(db, request).await?)
        }
        ["product", "show", code] => print_json(&commands::get_product(db, code).await?),
        ["product", "search", query @ ..] => {
            print_json(&commands::search_products(db, &query.join(" "), None).await?)
        }
        ["low-stock"] => print_json(&commands::low_stock_products(db, None).await?),

        // ---------------------------------------------------------------------
        // Stock
        // ---------------------------------------------------------------------
        ["restock", code, quantity, reason @ ..] => {
            let quantity = parse_int(quantity, "quantity")?;
            let reason = reason_or(reason, "restock");
            print_json(&commands::restock(db, code, quantity, &reason).await?)
        }
        ["sell", code, quantity, reason @ ..] => {
            let quantity = parse_int(quantity, "quantity")?;
            if quantity <= 0 {
                return Err(usage("sell quantity must be positive"));
            }
            let reason = reason_or(reason, "counter sale");
            let moved = commands::apply_stock_movement(
                db,
                code,
                -quantity,
                StockMovementKind::Sale,
                &reason,
            )
            .await?;
            print_json(&moved)
        }
        ["adjust", code, delta, reason @ ..] if !reason.is_empty() => {
            let delta = parse_int(delta, "delta")?;
            let moved = commands::apply_stock_movement(
                db,
                code,
                delta,
                StockMovementKind::Adjustment,
                &reason.join(" "),
            )
            .await?;
            print_json(&moved)
        }
        ["reverse", entry_id, reason @ ..] => {
            let reason = reason_or(reason, "reversal");
            print_json(&commands::reverse_stock_movement(db, entry_id, &reason).await?)
        }
        ["history", code] => print_json(&commands::stock_history(db, code, None).await?),

        // ---------------------------------------------------------------------
        // Invoices
        // ---------------------------------------------------------------------
        ["invoice", "new", rest @ ..] => {
            let mut customer = None;
            let mut notes = None;
            let mut flags = rest.iter();
            while let Some(flag) = flags.next() {
                let value = flags.next().copied();
                match (*flag, value) {
                    ("--customer", Some(v)) => customer = Some(v),
                    ("--notes", Some(v)) => notes = Some(v),
                    _ => return Err(usage(format!("Unexpected argument: {}", flag))),
                }
            }
            print_json(&commands::create_invoice(db, customer, notes).await?)
        }
        ["invoice", "add", invoice, code, quantity] => {
            let quantity = parse_int(quantity, "quantity")?;
            print_json(&commands::add_product_line(db, invoice, code, quantity, None).await?)
        }
        ["invoice", "add", invoice, code, quantity, "--price", price] => {
            let quantity = parse_int(quantity, "quantity")?;
            let price = Some(parse_amount(price)?);
            print_json(&commands::add_product_line(db, invoice, code, quantity, price).await?)
        }
        ["invoice", "add-custom", invoice, name, quantity, price] => {
            let quantity = parse_int(quantity, "quantity")?;
            let price = parse_amount(price)?;
            print_json(&commands::add_custom_line(db, invoice, name, quantity, price).await?)
        }
        ["invoice", "qty", invoice, item_id, quantity] => {
            let op = InvoiceItemOp::UpdateQuantity {
                item_id: item_id.to_string(),
                quantity: parse_int(quantity, "quantity")?,
            };
            print_json(&commands::mutate_invoice_items(db, invoice, op, None).await?)
        }
        ["invoice", "remove", invoice, item_id] => {
            let op = InvoiceItemOp::Remove {
                item_id: item_id.to_string(),
            };
            print_json(&commands::mutate_invoice_items(db, invoice, op, None).await?)
        }
        ["invoice", "discount", invoice, amount, rest @ ..] => {
            let discount = parse_amount(amount)?;
            let (manager, reason) = match rest {
                [] => (Decimal::ZERO, None),
                [manager, reason @ ..] => {
                    let reason = (!reason.is_empty()).then(|| reason.join(" "));
                    (parse_amount(manager)?, reason)
                }
            };
            let totals =
                commands::set_discounts(db, invoice, discount, manager, reason.as_deref()).await?;
            print_json(&totals)
        }
        ["invoice", "totals", invoice] => {
            print_json(&commands::get_invoice_totals(db, invoice).await?)
        }
        ["invoice", "show", invoice] => print_json(&commands::get_invoice(db, invoice).await?),
        ["invoice", "list", rest @ ..] => {
            let status = match rest {
                [] => None,
                [status] => Some(parse_status(status)?),
                _ => return Err(usage("invoice list takes at most one status")),
            };
            print_json(&commands::list_invoices(db, status, None).await?)
        }
        ["invoice", "pay", invoice, amount, method] => {
            let amount = parse_amount(amount)?;
            let method = PaymentMethod::from_str(method).map_err(usage)?;
            print_json(&commands::settle_payment(db, invoice, amount, method).await?)
        }
        ["invoice", "cancel", invoice] => {
            print_json(&commands::cancel_invoice(db, invoice).await?)
        }
        ["invoice", "share", invoice] => {
            print_json(&commands::issue_share_token(db, &office.config, invoice).await?)
        }
        ["invoice", "open", token] => {
            print_json(&commands::open_shared_invoice(db, &office.config, token).await?)
        }

        // ---------------------------------------------------------------------
        // Reports
        // ---------------------------------------------------------------------
        ["best-sellers"] => print_json(&commands::best_sellers(db, None).await?),
        ["best-sellers", limit] => {
            let limit = parse_int(limit, "limit")?;
            let limit = u32::try_from(limit).map_err(|_| usage("limit must be positive"))?;
            print_json(&commands::best_sellers(db, Some(limit)).await?)
        }

        _ => Err(usage(format!("Unknown command: {}", args.join(" ")))),
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(err: &ApiError) {
    match serde_json::to_string(err) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
}

fn parse_int(value: &str, what: &str) -> Result<i64, CliError> {
    value
        .parse()
        .map_err(|_| usage(format!("Invalid {}: {}", what, value)))
}

fn parse_amount(value: &str) -> Result<Decimal, CliError> {
    Decimal::from_str(value).map_err(|_| usage(format!("Invalid amount: {}", value)))
}

fn parse_status(value: &str) -> Result<InvoiceStatus, CliError> {
    match value {
        "draft" => Ok(InvoiceStatus::Draft),
        "paid" => Ok(InvoiceStatus::Paid),
        "uncompleted" => Ok(InvoiceStatus::Uncompleted),
        "cancelled" => Ok(InvoiceStatus::Cancelled),
        other => Err(usage(format!("Unknown status: {}", other))),
    }
}

fn reason_or(words: &[&str], default: &str) -> String {
    if words.is_empty() {
        default.to_string()
    } else {
        words.join(" ")
    }
}

fn print_usage() {
    println!("Lazordy back office");
    println!();
    println!("Usage: lazordy [--config PATH] <COMMAND>");
    println!();
    println!("Numbering:");
    println!("  next-number [YYYY-MM]                         Reserve the next invoice number");
    println!();
    println!("Catalog and stock:");
    println!("  product add <CODE> <NAME> <PRICE> [QTY]       Add a product with opening stock");
    println!("  product show <CODE>                           Show a product");
    println!("  product search <QUERY>                        Search item codes and names");
    println!("  low-stock                                     Products at or below threshold");
    println!("  restock <CODE> <QTY> [REASON]                 Receive goods");
    println!("  sell <CODE> <QTY> [REASON]                    Counter sale outside an invoice");
    println!("  adjust <CODE> <DELTA> <REASON>                Correct a stock count");
    println!("  reverse <ENTRY-ID> [REASON]                   Undo a stock movement");
    println!("  history <CODE>                                Stock movements, newest first");
    println!();
    println!("Invoices (by number or id):");
    println!("  invoice new [--customer ID] [--notes TEXT]");
    println!("  invoice add <INVOICE> <CODE> <QTY> [--price AMOUNT]");
    println!("  invoice add-custom <INVOICE> <NAME> <QTY> <PRICE>");
    println!("  invoice qty <INVOICE> <ITEM-ID> <QTY>");
    println!("  invoice remove <INVOICE> <ITEM-ID>");
    println!("  invoice discount <INVOICE> <AMOUNT> [MANAGER-AMOUNT] [REASON]");
    println!("  invoice totals <INVOICE>");
    println!("  invoice show <INVOICE>");
    println!("  invoice list [STATUS]");
    println!("  invoice pay <INVOICE> <AMOUNT> <cash|visa|instapay>");
    println!("  invoice cancel <INVOICE>");
    println!("  invoice share <INVOICE>");
    println!("  invoice open <TOKEN>");
    println!();
    println!("Reports:");
    println!("  best-sellers [LIMIT]");
}
