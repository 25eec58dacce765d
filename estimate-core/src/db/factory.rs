//! Choosing where leads and cost tables live.
//!
//! Each storage crate provides a [`RepositoryFactory`]; the binary collects
//! the ones it was built with into a [`RepositoryRegistry`] and opens the
//! backend named in its configuration.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use super::repository::{EstimateRepository, RepositoryError};

/// A backend name plus the connection string that backend understands.
///
/// | backend  | connection_string                           |
/// |----------|---------------------------------------------|
/// | `sqlite` | `sqlite:estimates.db?mode=rwc`, `:memory:`  |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

impl fmt::Display for DbConfig {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} ({})", self.backend, self.connection_string)
    }
}

#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Name matched against [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Connects to `connection_string` and prepares the schema and seed
    /// cost tables.
    async fn open(
        &self,
        connection_string: &str,
    ) -> Result<Box<dyn EstimateRepository>, RepositoryError>;
}

/// Storage backends compiled into the binary.
#[derive(Default)]
pub struct RepositoryRegistry {
    backends: BTreeMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `factory`. A later backend with the same name wins.
    pub fn with_backend(
        mut self,
        factory: Box<dyn RepositoryFactory>,
    ) -> Self {
        self.backends.insert(factory.backend_name(), factory);
        self
    }

    /// Opens the repository `config` points at.
    ///
    /// An unknown backend is a [`RepositoryError::Configuration`] naming the
    /// backends that are available.
    pub async fn open(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn EstimateRepository>, RepositoryError> {
        let Some(factory) = self.backends.get(config.backend.as_str()) else {
            let known: Vec<&str> = self.backends.keys().copied().collect();
            return Err(RepositoryError::Configuration(format!(
                "no '{}' storage backend in this build (have: {})",
                config.backend,
                known.join(", ")
            )));
        };

        debug!(%config, "opening repository");
        factory.open(&config.connection_string).await
    }
}
