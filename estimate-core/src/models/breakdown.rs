use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::round_to_unit;
use crate::models::{CostCategory, PricingUnit};

/// One priced quantity in a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub category: CostCategory,
    pub selector: String,
    pub quantity: Decimal,
    /// `None` when the selector has no entry in the cost table.
    pub unit: Option<PricingUnit>,
    pub unit_cost: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySubtotal {
    pub category: CostCategory,
    pub amount: Decimal,
}

/// Problems noticed while pricing that left part of the answers unpriced.
/// They never fail a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarning {
    UnmappedCostKey {
        category: CostCategory,
        selector: String,
    },
    /// Selectors were chosen but the quantity they are priced by is absent
    /// or zero, so nothing was charged for them.
    MissingQuantity {
        category: CostCategory,
        field: String,
    },
}

impl fmt::Display for PricingWarning {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::UnmappedCostKey { category, selector } => write!(
                f,
                "no unit cost for '{selector}' in {category}; priced at zero"
            ),
            Self::MissingQuantity { category, field } => write!(
                f,
                "{category} selected without '{field}'; not priced"
            ),
        }
    }
}

/// Result of pricing one set of answers against one cost-table version.
///
/// All amounts are kept at full precision; only [`PriceBreakdown::rounded_total`]
/// rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub cost_table_version: String,
    pub line_items: Vec<LineItem>,
    /// One entry per category that produced at least one line item, in
    /// [`CostCategory`] order.
    pub subtotals: Vec<CategorySubtotal>,
    pub total: Decimal,
    pub warnings: Vec<PricingWarning>,
}

impl PriceBreakdown {
    /// Subtotal for `category`, zero when nothing was priced in it.
    pub fn subtotal(
        &self,
        category: CostCategory,
    ) -> Decimal {
        self.subtotals
            .iter()
            .find(|s| s.category == category)
            .map_or(Decimal::ZERO, |s| s.amount)
    }

    /// Grand total rounded to the nearest whole currency unit, for display.
    pub fn rounded_total(&self) -> Decimal {
        round_to_unit(self.total)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn line_items_in(
        &self,
        category: CostCategory,
    ) -> impl Iterator<Item = &LineItem> {
        self.line_items
            .iter()
            .filter(move |item| item.category == category)
    }
}
