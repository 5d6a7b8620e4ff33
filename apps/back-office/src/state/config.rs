//! # Application Configuration
//!
//! Settings loaded once at startup and read-only afterwards.
//!
//! ## Configuration Sources (later wins)
//! 1. Defaults (this file)
//! 2. Config file (`lazordy.toml` in the platform config dir, or `--config`)
//! 3. Environment variables (`LAZORDY_*`)
//!
//! The merged result is validated before anything connects.
//!
//! ## Example `lazordy.toml`
//! ```toml
//! [database]
//! path = "/var/lib/lazordy/lazordy.db"
//! max_connections = 5
//!
//! [invoicing]
//! prefix = "LZR"
//! max_allocation_attempts = 5
//! share_token_ttl_minutes = 60
//!
//! [store]
//! name = "Lazordy"
//! currency_symbol = "EGP "
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lazordy_core::{
    Money, DEFAULT_INVOICE_PREFIX, DEFAULT_MAX_ALLOCATION_ATTEMPTS,
    DEFAULT_SHARE_TOKEN_TTL_MINUTES,
};
use lazordy_db::NumberingConfig;

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "lazordy.toml";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Environment variable {key} has invalid value '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Could not determine the application data directory")]
    NoDataDirectory,
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub invoicing: InvoicingSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    /// SQLite file. Defaults to `lazordy.db` in the platform data dir.
    pub path: Option<PathBuf>,

    /// Default: 5
    pub max_connections: u32,

    /// How long a writer waits for the write lock.
    /// Default: 5000
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvoicingSection {
    /// Default: "LZR"
    pub prefix: String,

    /// Reservations tried before a `-FIX-` number is issued.
    /// Default: 5
    pub max_allocation_attempts: u32,

    /// Default: 60
    pub share_token_ttl_minutes: i64,
}

impl Default for InvoicingSection {
    fn default() -> Self {
        InvoicingSection {
            prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            max_allocation_attempts: DEFAULT_MAX_ALLOCATION_ATTEMPTS,
            share_token_ttl_minutes: DEFAULT_SHARE_TOKEN_TTL_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Shown on printed totals.
    pub name: String,

    pub currency_symbol: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: "Lazordy".to_string(),
            currency_symbol: "EGP ".to_string(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl AppConfig {
    /// Loads defaults, then the config file, then `LAZORDY_*` overrides,
    /// and validates the result.
    ///
    /// An explicit path must exist. The platform default is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => AppConfig::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => AppConfig::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `LAZORDY_*` overrides from `vars`. Unrelated keys are ignored.
    ///
    /// ## Environment Variables
    /// - `LAZORDY_DB_PATH`
    /// - `LAZORDY_DB_MAX_CONNECTIONS`
    /// - `LAZORDY_INVOICE_PREFIX`
    /// - `LAZORDY_MAX_ALLOCATION_ATTEMPTS`
    /// - `LAZORDY_SHARE_TOKEN_TTL_MINUTES`
    /// - `LAZORDY_STORE_NAME`
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "LAZORDY_DB_PATH" => self.database.path = Some(PathBuf::from(value)),
                "LAZORDY_DB_MAX_CONNECTIONS" => {
                    self.database.max_connections = parse_env(&key, &value)?
                }
                "LAZORDY_INVOICE_PREFIX" => self.invoicing.prefix = value,
                "LAZORDY_MAX_ALLOCATION_ATTEMPTS" => {
                    self.invoicing.max_allocation_attempts = parse_env(&key, &value)?
                }
                "LAZORDY_SHARE_TOKEN_TTL_MINUTES" => {
                    self.invoicing.share_token_ttl_minutes = parse_env(&key, &value)?
                }
                "LAZORDY_STORE_NAME" => self.store.name = value,
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections", "must be at least 1"));
        }

        let prefix = &self.invoicing.prefix;
        if prefix.is_empty() || prefix.len() > 10 {
            return Err(ConfigError::invalid("invoicing.prefix", "must be 1 to 10 characters"));
        }
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::invalid("invoicing.prefix", "must be letters and digits only"));
        }

        if self.invoicing.max_allocation_attempts == 0 {
            return Err(ConfigError::invalid(
                "invoicing.max_allocation_attempts",
                "must be at least 1",
            ));
        }
        if self.invoicing.share_token_ttl_minutes <= 0 {
            return Err(ConfigError::invalid(
                "invoicing.share_token_ttl_minutes",
                "must be positive",
            ));
        }

        Ok(())
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    /// The configured database file, or `lazordy.db` in the platform data dir.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.lazordy.back-office/lazordy.db`
    /// - **Windows**: `%APPDATA%\lazordy\back-office\data\lazordy.db`
    /// - **Linux**: `~/.local/share/back-office/lazordy.db`
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoDataDirectory)?;
        Ok(dirs.data_dir().join("lazordy.db"))
    }

    pub fn numbering(&self) -> NumberingConfig {
        NumberingConfig::new(
            self.invoicing.prefix.clone(),
            self.invoicing.max_allocation_attempts,
        )
    }

    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.database.busy_timeout_ms)
    }

    pub fn share_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.invoicing.share_token_ttl_minutes)
    }

    /// Formats an amount with the store's currency symbol.
    pub fn format_money(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        let abs = Money::from_cents(amount.cents().abs());
        format!("{}{}{}", sign, self.store.currency_symbol, abs)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "lazordy", "back-office")
}

/// `lazordy.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.invoicing.prefix, "LZR");
        assert_eq!(config.invoicing.max_allocation_attempts, 5);
        assert_eq!(config.share_token_ttl(), chrono::Duration::minutes(60));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[invoicing]\nprefix = \"INV\"\n\n[store]\nname = \"Zamalek\"").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.invoicing.prefix, "INV");
        assert_eq!(config.invoicing.max_allocation_attempts, 5);
        assert_eq!(config.store.name, "Zamalek");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[invoicing]\nprefx = \"INV\"").unwrap();

        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            AppConfig::load(Some(Path::new("/definitely/not/here.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("LAZORDY_DB_PATH", "/tmp/x.db"),
                ("LAZORDY_INVOICE_PREFIX", "ABC"),
                ("LAZORDY_MAX_ALLOCATION_ATTEMPTS", "3"),
                ("HOME", "/root"),
            ]))
            .unwrap();

        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/x.db"));
        assert_eq!(config.numbering(), NumberingConfig::new("ABC", 3));

        let err = config
            .apply_env(env(&[("LAZORDY_SHARE_TOKEN_TTL_MINUTES", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.invoicing.prefix = "LZ-R".to_string();
        assert!(config.validate().is_err());

        config.invoicing.prefix = "LZR".to_string();
        config.invoicing.max_allocation_attempts = 0;
        assert!(config.validate().is_err());

        config.invoicing.max_allocation_attempts = 1;
        config.invoicing.share_token_ttl_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_money() {
        let config = AppConfig::default();
        assert_eq!(config.format_money(Money::from_cents(123456)), "EGP 1234.56");
        assert_eq!(config.format_money(Money::from_cents(-5)), "-EGP 0.05");
    }
}
