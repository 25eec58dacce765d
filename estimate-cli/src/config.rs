//! `Estimator` configuration file.
//!
//! Every key is optional; a missing file or section falls back to the
//! defaults below.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection = "sqlite:estimates.db?mode=rwc"
//!
//! [pricing]
//! currency_symbol = "€"
//! cost_table_version = "2026-01"   # pin; omit to use the table in force today
//!
//! [logging]
//! level = "info"
//! file = "estimator.log"
//! ```

use std::path::{Path, PathBuf};

use estimate_core::db::DbConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_connection")]
    pub connection: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            connection: default_connection(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_connection() -> String {
    "sqlite:estimates.db?mode=rwc".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default)]
    pub cost_table_version: Option<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            cost_table_version: None,
        }
    }
}

fn default_currency_symbol() -> String {
    "€".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EstimatorConfig {
    /// Reads `path`, or returns the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database.backend must not be empty".to_string(),
            ));
        }
        if self.database.connection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database.connection must not be empty".to_string(),
            ));
        }
        if self
            .pricing
            .cost_table_version
            .as_deref()
            .is_some_and(|v| v.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "pricing.cost_table_version must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            backend: self.database.backend.clone(),
            connection_string: self.database.connection.clone(),
        }
    }
}
