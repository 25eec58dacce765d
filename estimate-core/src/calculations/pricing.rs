//! Pricing Calculator: normalised answers + one cost table → itemised
//! [`PriceBreakdown`].
//!
//! # Quantities
//!
//! | Category    | Selector field(s)          | Quantity                          |
//! |-------------|----------------------------|-----------------------------------|
//! | Groundwork  | `terrain_type`             | footprint (`floor_area / levels`) |
//! | Walls       | `wall_material`            | `floor_area`                      |
//! | Facade      | facade percentage split    | share of `facade_area`            |
//! | Roof        | `roof_type`                | footprint                         |
//! | Flooring    | flooring percentage split  | share of `floor_area`             |
//! | Openings    | `window_type`, `door`      | `window_count`, `door_count`      |
//! | Plumbing    | `plumbing_tier`            | `bathroom_count`                  |
//! | Electrical  | `electrical_tier`          | `floor_area`                      |
//! | Landscaping | each `landscaping` option  | `landscaping_area`                |
//! | Options     | each `options` option      | 1                                 |
//!
//! A category whose selector is unanswered is simply absent from the
//! breakdown. Percentage splits are topped up to 100% with their base
//! selector.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use estimate_core::calculations::{PricingCalculator, UnitCostTable};
//! use estimate_core::{AnswerValue, CostCategory, FormAnswers, PricingUnit, UnitCostEntry};
//!
//! let table = UnitCostTable::new(
//!     "2025-01",
//!     NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!     vec![UnitCostEntry {
//!         category: CostCategory::Flooring,
//!         selector: "standard".to_string(),
//!         unit: PricingUnit::SquareMetre,
//!         unit_cost: dec!(45),
//!     }],
//! )
//! .unwrap();
//!
//! let answers: FormAnswers = [
//!     ("floor_area", AnswerValue::number(100)),
//!     ("flooring_standard_pct", AnswerValue::number(100)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let breakdown = PricingCalculator::new(&table).calculate(&answers).unwrap();
//!
//! assert_eq!(breakdown.subtotal(CostCategory::Flooring), dec!(4500));
//! assert_eq!(breakdown.total, dec!(4500));
//! ```

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::UnitCostTable;
use crate::calculations::common::percent_of;
use crate::error::ValidationError;
use crate::models::{
    CategorySubtotal, CostCategory, FormAnswers, LineItem, PriceBreakdown, PricingWarning,
};
use crate::schema::{FACADE_SPLIT, FLOORING_SPLIT, PercentSplit};

/// Selector doors are priced with in the openings category.
const DOOR_SELECTOR: &str = "door";

/// Calculator bound to exactly one cost-table version.
///
/// Holds no mutable state: the same answers always produce the same
/// breakdown.
#[derive(Debug, Clone, Copy)]
pub struct PricingCalculator<'a> {
    table: &'a UnitCostTable,
}

impl<'a> PricingCalculator<'a> {
    pub fn new(table: &'a UnitCostTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a UnitCostTable {
        self.table
    }

    /// Prices `answers`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] and no partial breakdown if:
    /// - `floor_area` is missing or not positive
    /// - `levels` is not positive
    /// - a quantity is negative or not a number
    /// - a percentage split is negative or adds up to more than 100%
    /// - a quantity is too large for its amount to be represented
    pub fn calculate(
        &self,
        answers: &FormAnswers,
    ) -> Result<PriceBreakdown, ValidationError> {
        let floor_area = quantity(answers, "floor_area")?
            .ok_or_else(|| ValidationError::required("floor_area"))?;
        if floor_area <= Decimal::ZERO {
            return Err(ValidationError::new("floor_area", "must be positive"));
        }
        let levels = quantity(answers, "levels")?.unwrap_or(Decimal::ONE);
        if levels <= Decimal::ZERO {
            return Err(ValidationError::new("levels", "must be positive"));
        }
        let footprint = floor_area
            .checked_div(levels)
            .ok_or_else(|| ValidationError::new("levels", "is too small"))?;

        let mut ledger = Ledger::new(self.table);

        // Groundwork
        if let Some(terrain) = answers.text("terrain_type") {
            ledger.charge(CostCategory::Groundwork, terrain, footprint, "floor_area")?;
        }

        // Walls
        if let Some(material) = answers.text("wall_material") {
            ledger.charge(CostCategory::Walls, material, floor_area, "floor_area")?;
        }

        // Facade
        if let Some(facade_area) = quantity(answers, FACADE_SPLIT.area_field)? {
            ledger.charge_split(&FACADE_SPLIT, answers, facade_area)?;
        } else {
            FACADE_SPLIT.allocations(answers)?;
        }

        // Roof
        if let Some(roof) = answers.text("roof_type") {
            ledger.charge(CostCategory::Roof, roof, footprint, "floor_area")?;
        }

        // Flooring
        ledger.charge_split(&FLOORING_SPLIT, answers, floor_area)?;

        // Openings
        if let Some(window) = answers.text("window_type") {
            let windows = quantity(answers, "window_count")?.unwrap_or(Decimal::ZERO);
            ledger.charge(CostCategory::Openings, window, windows, "window_count")?;
        }
        if let Some(doors) = quantity(answers, "door_count")? {
            ledger.charge(CostCategory::Openings, DOOR_SELECTOR, doors, "door_count")?;
        }

        // Plumbing
        if let Some(tier) = answers.text("plumbing_tier") {
            let bathrooms = quantity(answers, "bathroom_count")?.unwrap_or(Decimal::ONE);
            ledger.charge(CostCategory::Plumbing, tier, bathrooms, "bathroom_count")?;
        }

        // Electrical
        if let Some(tier) = answers.text("electrical_tier") {
            ledger.charge(CostCategory::Electrical, tier, floor_area, "floor_area")?;
        }

        // Landscaping
        if let Some(features) = answers.selection("landscaping") {
            let area = quantity(answers, "landscaping_area")?.unwrap_or(Decimal::ZERO);
            if area.is_zero() && !features.is_empty() {
                warn!("landscaping selected without an area; not priced");
                ledger.warn(PricingWarning::MissingQuantity {
                    category: CostCategory::Landscaping,
                    field: "landscaping_area".to_string(),
                });
            }
            for feature in features {
                ledger.charge(CostCategory::Landscaping, feature, area, "landscaping_area")?;
            }
        }

        // Options
        if let Some(options) = answers.selection("options") {
            for option in options {
                ledger.charge(CostCategory::Options, option, Decimal::ONE, "options")?;
            }
        }

        ledger.finish()
    }
}

/// A non-negative numeric answer. `None` when unanswered.
fn quantity(
    answers: &FormAnswers,
    field: &str,
) -> Result<Option<Decimal>, ValidationError> {
    let Some(value) = answers.get(field) else {
        return Ok(None);
    };
    let n = value
        .as_number()
        .ok_or_else(|| ValidationError::new(field, "must be a number"))?;
    if n < Decimal::ZERO {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    Ok(Some(n))
}

fn too_large(field: &str) -> ValidationError {
    ValidationError::new(field, "is too large to price")
}

/// Accumulates line items and warnings for one calculation.
struct Ledger<'t> {
    table: &'t UnitCostTable,
    line_items: Vec<LineItem>,
    warnings: Vec<PricingWarning>,
}

impl<'t> Ledger<'t> {
    fn new(table: &'t UnitCostTable) -> Self {
        Self {
            table,
            line_items: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(
        &mut self,
        warning: PricingWarning,
    ) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Prices `quantity` of `selector`. Zero quantities add no line.
    /// `field` names the answer the quantity came from.
    fn charge(
        &mut self,
        category: CostCategory,
        selector: &str,
        quantity: Decimal,
        field: &str,
    ) -> Result<(), ValidationError> {
        if quantity.is_zero() {
            debug!(category = %category, selector, "zero quantity; nothing to price");
            return Ok(());
        }

        let entry = self.table.entry(category, selector);
        let amount = self
            .table
            .cost_for(category, selector, quantity)
            .ok_or_else(|| too_large(field))?;

        if entry.is_none() {
            self.warn(PricingWarning::UnmappedCostKey {
                category,
                selector: selector.to_string(),
            });
        }

        self.line_items.push(LineItem {
            category,
            selector: selector.to_string(),
            quantity,
            unit: entry.map(|e| e.unit),
            unit_cost: entry.map_or(Decimal::ZERO, |e| e.unit_cost),
            amount,
        });
        Ok(())
    }

    /// Prices each explicit share of `area`, then the unallocated remainder
    /// at the split's base selector.
    fn charge_split(
        &mut self,
        split: &PercentSplit,
        answers: &FormAnswers,
        area: Decimal,
    ) -> Result<(), ValidationError> {
        let allocations = split.allocations(answers)?;
        let allocated: Decimal = allocations.iter().map(|(_, pct)| *pct).sum();
        let share = |pct| percent_of(area, pct).ok_or_else(|| too_large(split.area_field));

        for (selector, pct) in allocations {
            self.charge(split.category, selector, share(pct)?, split.area_field)?;
        }

        let remainder = Decimal::ONE_HUNDRED - allocated;
        if remainder > Decimal::ZERO {
            if allocated > Decimal::ZERO {
                warn!(
                    category = %split.category,
                    remainder = %remainder,
                    base = split.base_selector,
                    "percentages below 100%; pricing remainder at base rate"
                );
            }
            self.charge(
                split.category,
                split.base_selector,
                share(remainder)?,
                split.area_field,
            )?;
        }

        Ok(())
    }

    fn finish(self) -> Result<PriceBreakdown, ValidationError> {
        let mut subtotals = Vec::new();
        for category in CostCategory::ALL {
            let mut items = self
                .line_items
                .iter()
                .filter(|item| item.category == category)
                .peekable();
            if items.peek().is_none() {
                continue;
            }
            let amount = checked_sum(items.map(|item| item.amount))
                .ok_or_else(|| too_large(category.as_str()))?;
            subtotals.push(CategorySubtotal { category, amount });
        }

        let total = checked_sum(subtotals.iter().map(|s| s.amount))
            .ok_or_else(|| ValidationError::new("total", "is too large to represent"))?;

        Ok(PriceBreakdown {
            cost_table_version: self.table.version().to_string(),
            line_items: self.line_items,
            subtotals,
            total,
            warnings: self.warnings,
        })
    }
}

fn checked_sum(mut amounts: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    amounts.try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
}
