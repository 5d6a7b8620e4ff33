//! # Lazordy Back Office Library
//!
//! Configuration, logging setup and the operator-facing commands of the
//! back office. The `lazordy` binary is a thin CLI over this crate.
//!
//! ## Module Organization
//! ```text
//! lazordy_back_office/
//! ├── lib.rs          ◄─── You are here (startup)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── AppConfig: defaults, lazordy.toml, LAZORDY_* env
//! │   └── db.rs       ◄─── Database state wrapper
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── invoice.rs  ◄─── Invoice lines, totals, payment, share links
//! │   ├── stock.rs    ◄─── Stock movements
//! │   ├── numbering.rs◄─── Invoice number reservation
//! │   └── product.rs  ◄─── Catalog lookups
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use error::{ApiError, ErrorCode};
pub use state::{AppConfig, ConfigError, DbState};

/// Everything a command needs, built once at startup.
#[derive(Debug, Clone)]
pub struct BackOffice {
    pub config: AppConfig,
    pub db: DbState,
}

/// Loads configuration and opens the database.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. AppConfig::load      defaults → lazordy.toml → LAZORDY_* → validate │
/// │  2. Database path        [database].path or the platform data dir       │
/// │  3. DbState::open        WAL, busy timeout, run pending migrations      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn start(config_path: Option<&Path>) -> Result<BackOffice, ApiError> {
    let config = AppConfig::load(config_path)?;
    info!(
        prefix = %config.invoicing.prefix,
        store = %config.store.name,
        "Configuration loaded"
    );

    let db = DbState::open(&config).await?;
    Ok(BackOffice { config, db })
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=lazordy_db=trace` - Trace one crate only
/// - Default: `info,lazordy=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lazordy=debug,sqlx=warn"));

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
