use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level cost grouping of a price breakdown.
///
/// Declaration order is the order categories appear in a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Groundwork,
    Walls,
    Facade,
    Roof,
    Flooring,
    Openings,
    Plumbing,
    Electrical,
    Landscaping,
    Options,
}

impl CostCategory {
    pub const ALL: [CostCategory; 10] = [
        Self::Groundwork,
        Self::Walls,
        Self::Facade,
        Self::Roof,
        Self::Flooring,
        Self::Openings,
        Self::Plumbing,
        Self::Electrical,
        Self::Landscaping,
        Self::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groundwork => "groundwork",
            Self::Walls => "walls",
            Self::Facade => "facade",
            Self::Roof => "roof",
            Self::Flooring => "flooring",
            Self::Openings => "openings",
            Self::Plumbing => "plumbing",
            Self::Electrical => "electrical",
            Self::Landscaping => "landscaping",
            Self::Options => "options",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Groundwork => "Groundwork",
            Self::Walls => "Walls",
            Self::Facade => "Facade",
            Self::Roof => "Roof",
            Self::Flooring => "Flooring",
            Self::Openings => "Windows & doors",
            Self::Plumbing => "Plumbing",
            Self::Electrical => "Electrical",
            Self::Landscaping => "Landscaping",
            Self::Options => "Options",
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit a cost is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingUnit {
    SquareMetre,
    Each,
}

impl PricingUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SquareMetre => "m2",
            Self::Each => "each",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "m2" => Some(Self::SquareMetre),
            "each" => Some(Self::Each),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::SquareMetre => "m²",
            Self::Each => "u",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCostEntry {
    pub category: CostCategory,
    pub selector: String,
    pub unit: PricingUnit,
    pub unit_cost: Decimal,
}

/// Header record of a stored cost table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostTableVersion {
    pub version: String,
    pub effective_from: NaiveDate,
}
