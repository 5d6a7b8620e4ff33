//! # Database State
//!
//! Wraps the `Database` connection for use by the commands.
//!
//! The `Database` from `lazordy-db` holds a `SqlitePool`, so commands can
//! run concurrently without extra locking. Concurrent writers queue on the
//! SQLite write lock.

use tracing::info;

use crate::error::ApiError;
use crate::state::AppConfig;
use lazordy_db::{Database, DbConfig};

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Opens (and migrates) the database described by `config`.
    pub async fn open(config: &AppConfig) -> Result<Self, ApiError> {
        let path = config.database_path()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ApiError::internal(format!("Cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let db_config = DbConfig::new(&path)
            .max_connections(config.database.max_connections)
            .busy_timeout(config.busy_timeout())
            .numbering(config.numbering());

        let db = Database::new(db_config).await?;
        info!(path = %path.display(), "Database ready");

        Ok(DbState { db })
    }

    /// Wraps an already-open database.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}
