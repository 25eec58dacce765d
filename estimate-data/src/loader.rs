use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use estimate_core::calculations::{CostTableError, CostTableSet, UnitCostTable};
use estimate_core::{
    CostCategory, CostTableVersion, EstimateRepository, PricingUnit, RepositoryError,
    UnitCostEntry,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading unit-cost data.
#[derive(Debug, Error)]
pub enum CostTableLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Unknown cost category '{0}'")]
    UnknownCategory(String),

    #[error("Unknown pricing unit '{0}' (expected 'm2' or 'each')")]
    UnknownUnit(String),

    #[error("Version '{version}' is given two effective dates: {first} and {second}")]
    ConflictingEffectiveDate {
        version: String,
        first: NaiveDate,
        second: NaiveDate,
    },

    #[error("Invalid cost table: {0}")]
    CostTable(#[from] CostTableError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for CostTableLoaderError {
    fn from(err: csv::Error) -> Self {
        CostTableLoaderError::CsvParse(err.to_string())
    }
}

/// One row of a unit-cost CSV file.
///
/// - `version`: cost-table version tag (e.g. `2025-01`)
/// - `effective_from`: first day the version applies, `YYYY-MM-DD`
/// - `category`: cost category (`groundwork`, `walls`, ...)
/// - `selector`: option priced within the category (`brick`, `base`, ...)
/// - `unit`: `m2` or `each`
/// - `unit_cost`: price per unit
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CostRecord {
    pub version: String,
    pub effective_from: NaiveDate,
    pub category: String,
    pub selector: String,
    pub unit: String,
    pub unit_cost: Decimal,
}

impl CostRecord {
    fn to_entry(&self) -> Result<UnitCostEntry, CostTableLoaderError> {
        let category = CostCategory::parse(self.category.trim())
            .ok_or_else(|| CostTableLoaderError::UnknownCategory(self.category.clone()))?;
        let unit = PricingUnit::parse(self.unit.trim())
            .ok_or_else(|| CostTableLoaderError::UnknownUnit(self.unit.clone()))?;

        Ok(UnitCostEntry {
            category,
            selector: self.selector.trim().to_string(),
            unit,
            unit_cost: self.unit_cost,
        })
    }
}

/// Loader for unit-cost tables from CSV files.
///
/// One file may hold several versions. Each version is validated as a whole
/// before anything is written.
pub struct CostTableLoader;

impl CostTableLoader {
    /// Parse unit-cost records from any CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<CostRecord>, CostTableLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: CostRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Builds one validated table per version found in `records`.
    pub fn tables(records: &[CostRecord]) -> Result<Vec<UnitCostTable>, CostTableLoaderError> {
        let mut groups: BTreeMap<&str, (NaiveDate, Vec<UnitCostEntry>)> = BTreeMap::new();

        for record in records {
            let entry = record.to_entry()?;
            let (effective_from, entries) = groups
                .entry(record.version.as_str())
                .or_insert_with(|| (record.effective_from, Vec::new()));

            if *effective_from != record.effective_from {
                return Err(CostTableLoaderError::ConflictingEffectiveDate {
                    version: record.version.clone(),
                    first: *effective_from,
                    second: record.effective_from,
                });
            }
            entries.push(entry);
        }

        groups
            .into_iter()
            .map(|(version, (effective_from, entries))| {
                UnitCostTable::new(version, effective_from, entries).map_err(Into::into)
            })
            .collect()
    }

    /// Parsed records as an in-memory [`CostTableSet`], no database needed.
    pub fn into_table_set(records: &[CostRecord]) -> Result<CostTableSet, CostTableLoaderError> {
        let mut set = CostTableSet::new();
        for table in Self::tables(records)? {
            set.insert(table)?;
        }
        Ok(set)
    }

    /// Load unit-cost records into the repository.
    ///
    /// Every version in `records` replaces any stored version with the same
    /// tag, one version per repository transaction: a version that fails to
    /// write keeps its previous contents. Running the same load twice leaves
    /// the same data. Versions not mentioned in `records` are left alone.
    ///
    /// Returns the number of unit costs written.
    pub async fn load<R: EstimateRepository + ?Sized>(
        repo: &R,
        records: &[CostRecord],
    ) -> Result<usize, CostTableLoaderError> {
        let tables = Self::tables(records)?;
        let mut inserted = 0;

        for table in &tables {
            repo.replace_cost_table(table).await?;
            inserted += table.len();

            info!(
                version = table.version(),
                effective_from = %table.effective_from(),
                entries = table.len(),
                "cost table loaded"
            );
        }

        Ok(inserted)
    }

    /// Headers of the versions contained in `records`, oldest first.
    pub fn versions(records: &[CostRecord]) -> Vec<CostTableVersion> {
        let mut versions: Vec<CostTableVersion> = records
            .iter()
            .map(|r| CostTableVersion {
                version: r.version.clone(),
                effective_from: r.effective_from,
            })
            .collect();
        versions.sort_by(|a, b| {
            a.effective_from
                .cmp(&b.effective_from)
                .then_with(|| a.version.cmp(&b.version))
        });
        versions.dedup();
        versions
    }
}
