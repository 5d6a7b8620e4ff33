//! # State Module
//!
//! Long-lived state shared by every command.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────────────┐  │
//! │  │      DbState         │        │          AppConfig               │  │
//! │  │                      │        │                                  │  │
//! │  │  Database            │        │  [database]  path, pool size     │  │
//! │  │  (SQLite pool,       │        │  [invoicing] prefix, attempts,   │  │
//! │  │   WAL, busy timeout) │        │              share token TTL     │  │
//! │  │                      │        │  [store]     name, currency      │  │
//! │  └──────────────────────┘        └──────────────────────────────────┘  │
//! │                                                                         │
//! │  DbState: clone freely, the pool is shared                             │
//! │  AppConfig: read-only after startup                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;

pub use config::{default_config_path, AppConfig, ConfigError, CONFIG_FILE_NAME};
pub use db::DbState;
