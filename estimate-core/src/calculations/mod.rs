//! Cost lookup and pricing.
//!
//! [`cost_table`] holds the versioned, read-only unit costs; [`pricing`]
//! turns a normalised answer set plus exactly one cost table into a
//! [`PriceBreakdown`](crate::models::PriceBreakdown).

pub mod common;
pub mod cost_table;
pub mod pricing;

pub use cost_table::{CostTableError, CostTableSet, MAX_UNIT_COST, UnitCostTable};
pub use pricing::PricingCalculator;
