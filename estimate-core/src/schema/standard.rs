use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{FACADE_SPLIT, FLOORING_SPLIT, FieldKind, FieldRule, StepDefinition, Visibility};
use crate::models::CostCategory;

const CLIENT_TYPES: &[&str] = &["individual", "professional"];
const ACTIVITIES: &[&str] = &["architect", "developer", "contractor", "other"];
const PROJECT_TYPES: &[&str] = &["construction", "renovation", "extension"];
const TERRAIN_TYPES: &[&str] = &["flat", "sloped", "rocky"];
const WALL_MATERIALS: &[&str] = &["brick", "concrete-block", "wood-frame", "stone"];
const ROOF_TYPES: &[&str] = &["tile", "slate", "metal", "flat-membrane"];
const WINDOW_TYPES: &[&str] = &["pvc", "aluminium", "wood"];
const PLUMBING_TIERS: &[&str] = &["basic", "standard", "premium"];
const ELECTRICAL_TIERS: &[&str] = &["basic", "standard", "smart-home"];
const LANDSCAPING: &[&str] = &["lawn", "garden", "paving", "fencing"];
const OPTIONS: &[&str] = &["pool", "garage", "solar-panels", "heat-pump", "alarm"];

fn choice(
    options: &'static [&'static str],
    priced_as: Option<CostCategory>,
) -> FieldKind {
    FieldKind::Choice { options, priced_as }
}

fn number(
    min: Decimal,
    max: Decimal,
) -> FieldKind {
    FieldKind::Number { min, max }
}

fn percentage() -> FieldKind {
    number(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

pub(super) fn steps() -> Vec<StepDefinition> {
    let construction_only = Visibility::Equals {
        field: "project_type",
        value: "construction",
    };

    vec![
        StepDefinition {
            id: "client",
            ordinal: 1,
            title: "About you",
            visibility: Visibility::Always,
            fields: vec![FieldRule::required("client_type", choice(CLIENT_TYPES, None))],
            splits: vec![],
        },
        StepDefinition {
            id: "professional_activity",
            ordinal: 2,
            title: "Professional activity",
            visibility: Visibility::Equals {
                field: "client_type",
                value: "professional",
            },
            fields: vec![
                FieldRule::required("company_name", FieldKind::Text { max_len: 120 }),
                FieldRule::required("activity", choice(ACTIVITIES, None)),
            ],
            splits: vec![],
        },
        StepDefinition {
            id: "project",
            ordinal: 3,
            title: "Your project",
            visibility: Visibility::Always,
            fields: vec![
                FieldRule::required("project_type", choice(PROJECT_TYPES, None)),
                FieldRule::required("floor_area", number(dec!(10), dec!(5000))),
                FieldRule::required("levels", number(Decimal::ONE, dec!(5))),
            ],
            splits: vec![],
        },
        StepDefinition {
            id: "terrain",
            ordinal: 4,
            title: "Terrain",
            visibility: construction_only.clone(),
            fields: vec![FieldRule::required(
                "terrain_type",
                choice(TERRAIN_TYPES, Some(CostCategory::Groundwork)),
            )],
            splits: vec![],
        },
        StepDefinition {
            id: "structure",
            ordinal: 5,
            title: "Structure",
            visibility: Visibility::Always,
            fields: vec![FieldRule::required(
                "wall_material",
                choice(WALL_MATERIALS, Some(CostCategory::Walls)),
            )],
            splits: vec![],
        },
        StepDefinition {
            id: "facade",
            ordinal: 6,
            title: "Facade",
            visibility: Visibility::Always,
            fields: vec![
                FieldRule::required("facade_area", number(Decimal::ZERO, dec!(10000))),
                FieldRule::optional("facade_stone_pct", percentage()),
                FieldRule::optional("facade_plaster_pct", percentage()),
                FieldRule::optional("facade_brick_pct", percentage()),
                FieldRule::optional("facade_wood_pct", percentage()),
            ],
            splits: vec![FACADE_SPLIT],
        },
        StepDefinition {
            id: "roof",
            ordinal: 7,
            title: "Roof",
            visibility: Visibility::Always,
            fields: vec![FieldRule::required(
                "roof_type",
                choice(ROOF_TYPES, Some(CostCategory::Roof)),
            )],
            splits: vec![],
        },
        StepDefinition {
            id: "flooring",
            ordinal: 8,
            title: "Flooring",
            visibility: Visibility::Always,
            fields: vec![
                FieldRule::optional("flooring_economy_pct", percentage()),
                FieldRule::optional("flooring_standard_pct", percentage()),
                FieldRule::optional("flooring_premium_pct", percentage()),
            ],
            splits: vec![FLOORING_SPLIT],
        },
        StepDefinition {
            id: "openings",
            ordinal: 9,
            title: "Windows and doors",
            visibility: Visibility::Always,
            fields: vec![
                FieldRule::required(
                    "window_type",
                    choice(WINDOW_TYPES, Some(CostCategory::Openings)),
                ),
                FieldRule::required("window_count", number(Decimal::ZERO, dec!(200))),
                FieldRule::required("door_count", number(Decimal::ZERO, dec!(50))),
            ],
            splits: vec![],
        },
        StepDefinition {
            id: "utilities",
            ordinal: 10,
            title: "Plumbing and electrical",
            visibility: Visibility::Always,
            fields: vec![
                FieldRule::required(
                    "plumbing_tier",
                    choice(PLUMBING_TIERS, Some(CostCategory::Plumbing)),
                ),
                FieldRule::required("bathroom_count", number(Decimal::ONE, dec!(10))),
                FieldRule::required(
                    "electrical_tier",
                    choice(ELECTRICAL_TIERS, Some(CostCategory::Electrical)),
                ),
            ],
            splits: vec![],
        },
        StepDefinition {
            id: "landscaping",
            ordinal: 11,
            title: "Landscaping",
            visibility: construction_only,
            fields: vec![
                FieldRule::optional(
                    "landscaping",
                    FieldKind::MultiChoice {
                        options: LANDSCAPING,
                        priced_as: Some(CostCategory::Landscaping),
                    },
                ),
                FieldRule::optional("landscaping_area", number(Decimal::ZERO, dec!(100000))),
            ],
            splits: vec![],
        },
        StepDefinition {
            id: "options",
            ordinal: 12,
            title: "Options",
            visibility: Visibility::Always,
            fields: vec![FieldRule::optional(
                "options",
                FieldKind::MultiChoice {
                    options: OPTIONS,
                    priced_as: Some(CostCategory::Options),
                },
            )],
            splits: vec![],
        },
        StepDefinition {
            id: "contact",
            ordinal: 13,
            title: "Contact details",
            visibility: Visibility::Always,
            fields: vec![
                FieldRule::required("contact_name", FieldKind::Text { max_len: 120 }),
                FieldRule::required("contact_email", FieldKind::Email),
                FieldRule::optional("contact_phone", FieldKind::Text { max_len: 30 }),
            ],
            splits: vec![],
        },
    ]
}
