//! Versioned unit-cost tables.
//!
//! A [`UnitCostTable`] is one immutable version of the firm's price list.
//! Tables are grouped in a [`CostTableSet`] so that an estimate submitted
//! under an older price list can be recomputed against the exact version it
//! was priced with.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use estimate_core::calculations::UnitCostTable;
//! use estimate_core::{CostCategory, PricingUnit, UnitCostEntry};
//!
//! let table = UnitCostTable::new(
//!     "2025-01",
//!     NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!     vec![UnitCostEntry {
//!         category: CostCategory::Roof,
//!         selector: "tile".to_string(),
//!         unit: PricingUnit::SquareMetre,
//!         unit_cost: dec!(95),
//!     }],
//! )
//! .unwrap();
//!
//! assert_eq!(table.cost_for(CostCategory::Roof, "tile", dec!(80)), Some(dec!(7600)));
//! assert_eq!(table.cost_for(CostCategory::Roof, "thatch", dec!(80)), Some(dec!(0)));
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::warn;

use crate::models::{CostCategory, CostTableVersion, UnitCostEntry};

/// Largest unit cost a table may carry.
pub const MAX_UNIT_COST: Decimal = dec!(1_000_000_000);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CostTableError {
    #[error("cost table '{version}' lists {category}/{selector} more than once")]
    DuplicateEntry {
        version: String,
        category: CostCategory,
        selector: String,
    },

    #[error("cost table '{version}' has a negative unit cost for {category}/{selector}")]
    NegativeCost {
        version: String,
        category: CostCategory,
        selector: String,
    },

    #[error("cost table '{version}' has a unit cost above 1000000000 for {category}/{selector}")]
    UnitCostTooLarge {
        version: String,
        category: CostCategory,
        selector: String,
    },

    #[error("cost table version '{0}' is already loaded")]
    DuplicateVersion(String),

    #[error("unknown cost table version '{0}'")]
    UnknownVersion(String),

    #[error("no cost table is effective on {0}")]
    NoTableEffectiveOn(NaiveDate),
}

/// One read-only version of the unit-cost price list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitCostTable {
    version: String,
    effective_from: NaiveDate,
    entries: BTreeMap<CostCategory, BTreeMap<String, UnitCostEntry>>,
}

impl UnitCostTable {
    /// Builds a table, rejecting duplicate selectors and unit costs outside
    /// `0..=MAX_UNIT_COST`.
    pub fn new(
        version: impl Into<String>,
        effective_from: NaiveDate,
        entries: Vec<UnitCostEntry>,
    ) -> Result<Self, CostTableError> {
        let version = version.into();
        let mut by_category: BTreeMap<CostCategory, BTreeMap<String, UnitCostEntry>> =
            BTreeMap::new();

        for entry in entries {
            if entry.unit_cost < Decimal::ZERO {
                return Err(CostTableError::NegativeCost {
                    version,
                    category: entry.category,
                    selector: entry.selector,
                });
            }
            if entry.unit_cost > MAX_UNIT_COST {
                return Err(CostTableError::UnitCostTooLarge {
                    version,
                    category: entry.category,
                    selector: entry.selector,
                });
            }

            let selectors = by_category.entry(entry.category).or_default();
            if selectors.contains_key(&entry.selector) {
                return Err(CostTableError::DuplicateEntry {
                    version,
                    category: entry.category,
                    selector: entry.selector,
                });
            }
            selectors.insert(entry.selector.clone(), entry);
        }

        Ok(Self {
            version,
            effective_from,
            entries: by_category,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn effective_from(&self) -> NaiveDate {
        self.effective_from
    }

    pub fn header(&self) -> CostTableVersion {
        CostTableVersion {
            version: self.version.clone(),
            effective_from: self.effective_from,
        }
    }

    pub fn entry(
        &self,
        category: CostCategory,
        selector: &str,
    ) -> Option<&UnitCostEntry> {
        self.entries.get(&category)?.get(selector)
    }

    pub fn contains(
        &self,
        category: CostCategory,
        selector: &str,
    ) -> bool {
        self.entry(category, selector).is_some()
    }

    pub fn unit_cost(
        &self,
        category: CostCategory,
        selector: &str,
    ) -> Option<Decimal> {
        self.entry(category, selector).map(|e| e.unit_cost)
    }

    /// `quantity × unit cost` for the selector.
    ///
    /// An unknown selector is a data problem rather than a user error: it is
    /// logged and priced at zero so the rest of the estimate still completes.
    /// Returns `None` when the product does not fit in a [`Decimal`].
    pub fn cost_for(
        &self,
        category: CostCategory,
        selector: &str,
        quantity: Decimal,
    ) -> Option<Decimal> {
        match self.unit_cost(category, selector) {
            Some(cost) => quantity.checked_mul(cost),
            None => {
                warn!(
                    version = %self.version,
                    category = %category,
                    selector,
                    "no unit cost for selector; pricing at zero"
                );
                Some(Decimal::ZERO)
            }
        }
    }

    /// All entries, ordered by category then selector.
    pub fn entries(&self) -> impl Iterator<Item = &UnitCostEntry> {
        self.entries.values().flat_map(|selectors| selectors.values())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every known cost-table version, keyed by version tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostTableSet {
    tables: BTreeMap<String, UnitCostTable>,
}

impl CostTableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        table: UnitCostTable,
    ) -> Result<(), CostTableError> {
        if self.tables.contains_key(table.version()) {
            return Err(CostTableError::DuplicateVersion(table.version.clone()));
        }
        self.tables.insert(table.version.clone(), table);
        Ok(())
    }

    pub fn get(
        &self,
        version: &str,
    ) -> Result<&UnitCostTable, CostTableError> {
        self.tables
            .get(version)
            .ok_or_else(|| CostTableError::UnknownVersion(version.to_string()))
    }

    /// The table in force on `date`: the latest `effective_from` not after
    /// `date`. Two versions effective the same day resolve to the greater
    /// version tag.
    pub fn effective_on(
        &self,
        date: NaiveDate,
    ) -> Result<&UnitCostTable, CostTableError> {
        self.tables
            .values()
            .filter(|t| t.effective_from <= date)
            .max_by(|a, b| {
                a.effective_from
                    .cmp(&b.effective_from)
                    .then_with(|| a.version.cmp(&b.version))
            })
            .ok_or(CostTableError::NoTableEffectiveOn(date))
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
