use std::path::PathBuf;

use async_trait::async_trait;
use estimate_core::db::RepositoryFactory;
use estimate_core::{EstimateRepository, RepositoryError};
use tracing::info;

use crate::repository::SqliteRepository;

/// Seeds directory, first match wins:
/// 1. `ESTIMATE_DB_SQLITE_SEEDS_DIR`
/// 2. `./seeds` in the working directory
/// 3. `$CARGO_MANIFEST_DIR/seeds`
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ESTIMATE_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// The `"sqlite"` backend.
///
/// ```rust,no_run
/// use estimate_core::db::RepositoryRegistry;
/// use estimate_db_sqlite::SqliteRepositoryFactory;
///
/// let registry = RepositoryRegistry::new().with_backend(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens `connection_string`, migrates it and applies the seed cost
    /// tables. Seeds only add missing rows, so reopening an existing
    /// database is safe.
    async fn open(
        &self,
        connection_string: &str,
    ) -> Result<Box<dyn EstimateRepository>, RepositoryError> {
        let repo = SqliteRepository::new(connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

        let seeds = seeds_dir();
        repo.run_seeds(&seeds)
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

        info!(
            database = connection_string,
            seeds = %seeds.display(),
            "sqlite repository ready"
        );
        Ok(Box::new(repo))
    }
}
