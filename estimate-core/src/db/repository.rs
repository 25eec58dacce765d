use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::calculations::{CostTableSet, UnitCostTable};
use crate::models::{CostTableVersion, Lead, NewLead, UnitCostEntry};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Storage for cost tables and submitted leads.
///
/// Leads are written once, at submission, and read back only by admin
/// tooling.
#[async_trait]
pub trait EstimateRepository: Send + Sync {
    // Cost tables
    async fn list_cost_table_versions(&self) -> Result<Vec<CostTableVersion>, RepositoryError>;

    async fn get_cost_table(
        &self,
        version: &str,
    ) -> Result<UnitCostTable, RepositoryError>;

    async fn insert_cost_table(
        &self,
        header: &CostTableVersion,
    ) -> Result<(), RepositoryError>;

    async fn insert_unit_cost(
        &self,
        version: &str,
        entry: &UnitCostEntry,
    ) -> Result<(), RepositoryError>;

    /// Removes a version and all its unit costs. Missing versions are not an
    /// error.
    async fn delete_cost_table(
        &self,
        version: &str,
    ) -> Result<(), RepositoryError>;

    /// Stores `table` in place of any version with the same tag. Either the
    /// whole table is written or the store is left unchanged.
    async fn replace_cost_table(
        &self,
        table: &UnitCostTable,
    ) -> Result<(), RepositoryError>;

    // Leads
    async fn create_lead(
        &self,
        lead: NewLead,
    ) -> Result<Lead, RepositoryError>;

    async fn get_lead(
        &self,
        id: i64,
    ) -> Result<Lead, RepositoryError>;

    /// Leads newest first, optionally only those owned by `owner_id`.
    async fn list_leads(
        &self,
        owner_id: Option<&str>,
    ) -> Result<Vec<Lead>, RepositoryError>;
}

/// Reads every stored cost-table version into memory.
pub async fn load_cost_table_set(
    repo: &dyn EstimateRepository
) -> Result<CostTableSet, RepositoryError> {
    let mut set = CostTableSet::new();
    for header in repo.list_cost_table_versions().await? {
        let table = repo.get_cost_table(&header.version).await?;
        debug!(version = %header.version, entries = table.len(), "cost table loaded");
        set.insert(table)
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;
    }
    Ok(set)
}
