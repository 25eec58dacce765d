//! Step Schema Registry: the ordered, conditionally visible wizard steps and
//! the validation contract of each.
//!
//! Visibility is data, not UI code. Each [`StepDefinition`] carries a
//! [`Visibility`] predicate that is evaluated against the accumulated
//! [`FormAnswers`], so the whole wizard can be exercised without any front
//! end.

mod field;
mod split;
mod standard;

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::warn;

pub use field::{FieldKind, FieldRule};
pub use split::{FACADE_SPLIT, FLOORING_SPLIT, PercentSplit};

use crate::calculations::UnitCostTable;
use crate::error::ValidationError;
use crate::models::{CostCategory, FormAnswers};

/// When a step is shown.
///
/// Predicates over fields that have not been answered yet evaluate to
/// `false`: a step stays hidden until its dependency is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Always,
    Equals {
        field: &'static str,
        value: &'static str,
    },
    OneOf {
        field: &'static str,
        values: &'static [&'static str],
    },
}

impl Visibility {
    pub fn evaluate(
        &self,
        answers: &FormAnswers,
    ) -> bool {
        match self {
            Self::Always => true,
            Self::Equals { field, value } => answers.text(field) == Some(*value),
            Self::OneOf { field, values } => answers
                .text(field)
                .is_some_and(|answer| values.iter().any(|v| *v == answer)),
        }
    }
}

/// Per-field errors from validating one step. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: &'static str,
    pub ordinal: u32,
    pub title: &'static str,
    pub visibility: Visibility,
    pub fields: Vec<FieldRule>,
    pub splits: Vec<PercentSplit>,
}

impl StepDefinition {
    pub fn is_visible(
        &self,
        answers: &FormAnswers,
    ) -> bool {
        self.visibility.evaluate(answers)
    }

    pub fn field(
        &self,
        name: &str,
    ) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks every field of the step, then every percentage split. Never
    /// fails on malformed input; problems come back as errors.
    pub fn validate(
        &self,
        answers: &FormAnswers,
    ) -> ValidationResult {
        let mut errors: Vec<ValidationError> = self
            .fields
            .iter()
            .filter_map(|rule| rule.check(answers.get(rule.name)))
            .collect();

        for split in &self.splits {
            if let Err(error) = split.allocations(answers) {
                // A malformed share is already reported by its field rule.
                if !errors.iter().any(|e| e.field == error.field) {
                    errors.push(error);
                }
            }
        }

        ValidationResult { errors }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("a step registry needs at least one step")]
    Empty,

    #[error("step id '{0}' is defined more than once")]
    DuplicateId(&'static str),

    #[error("ordinal {0} is used by more than one step")]
    DuplicateOrdinal(u32),
}

/// Immutable, ordinal-ordered collection of wizard steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl StepRegistry {
    /// Builds a registry, sorting steps by ordinal.
    pub fn new(mut steps: Vec<StepDefinition>) -> Result<Self, SchemaError> {
        if steps.is_empty() {
            return Err(SchemaError::Empty);
        }

        steps.sort_by_key(|s| s.ordinal);

        let mut ids = BTreeSet::new();
        for pair in steps.windows(2) {
            if pair[0].ordinal == pair[1].ordinal {
                return Err(SchemaError::DuplicateOrdinal(pair[0].ordinal));
            }
        }
        for step in &steps {
            if !ids.insert(step.id) {
                return Err(SchemaError::DuplicateId(step.id));
            }
        }

        Ok(Self { steps })
    }

    /// The firm's construction estimation wizard.
    pub fn standard() -> Self {
        Self {
            steps: standard::steps(),
        }
    }

    /// All steps in ordinal order, visible or not.
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step(
        &self,
        id: &str,
    ) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps applicable to `answers`, in ordinal order. Pure: identical
    /// answers always give the identical sequence.
    pub fn visible_steps(
        &self,
        answers: &FormAnswers,
    ) -> Vec<&StepDefinition> {
        self.steps
            .iter()
            .filter(|s| s.is_visible(answers))
            .collect()
    }

    pub fn validate_step(
        &self,
        step: &StepDefinition,
        answers: &FormAnswers,
    ) -> ValidationResult {
        step.validate(answers)
    }

    /// Answers restricted to the fields of currently visible steps.
    ///
    /// Answers left behind on a step that has since been hidden (for example
    /// terrain details after switching to a renovation) must not be priced.
    pub fn normalize(
        &self,
        answers: &FormAnswers,
    ) -> FormAnswers {
        let visible = self.visible_steps(answers);
        answers
            .iter()
            .filter(|(name, _)| visible.iter().any(|step| step.field(name).is_some()))
            .map(|(name, value)| (name, value.clone()))
            .collect()
    }

    /// Priced selectors declared by the schema that `table` has no cost for.
    ///
    /// Each gap is logged; pricing such a selector falls back to zero.
    pub fn unmapped_selectors(
        &self,
        table: &UnitCostTable,
    ) -> Vec<(CostCategory, &'static str)> {
        let mut declared: BTreeSet<(CostCategory, &'static str)> = BTreeSet::new();

        for step in &self.steps {
            for rule in &step.fields {
                if let Some((category, options)) = rule.priced_options() {
                    declared.extend(options.iter().map(|o| (category, *o)));
                }
            }
            for split in &step.splits {
                declared.extend(split.selectors().map(|s| (split.category, s)));
            }
        }

        let missing: Vec<_> = declared
            .into_iter()
            .filter(|(category, selector)| !table.contains(*category, selector))
            .collect();

        for (category, selector) in &missing {
            warn!(
                version = table.version(),
                category = %category,
                selector,
                "selector offered by the wizard has no unit cost"
            );
        }

        missing
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{AnswerValue, PricingUnit, UnitCostEntry};

    fn answers(pairs: &[(&str, AnswerValue)]) -> FormAnswers {
        pairs.iter().cloned().collect()
    }

    fn ids(steps: &[&StepDefinition]) -> Vec<&'static str> {
        steps.iter().map(|s| s.id).collect()
    }

    fn step(
        id: &'static str,
        ordinal: u32,
    ) -> StepDefinition {
        StepDefinition {
            id,
            ordinal,
            title: id,
            visibility: Visibility::Always,
            fields: vec![],
            splits: vec![],
        }
    }

    // =========================================================================
    // Visibility tests
    // =========================================================================

    #[test]
    fn equals_is_false_for_unanswered_field() {
        let visibility = Visibility::Equals {
            field: "project_type",
            value: "construction",
        };

        assert!(!visibility.evaluate(&FormAnswers::new()));
    }

    #[test]
    fn one_of_matches_any_listed_value() {
        let visibility = Visibility::OneOf {
            field: "project_type",
            values: &["construction", "extension"],
        };
        let extension = answers(&[("project_type", AnswerValue::text("extension"))]);
        let renovation = answers(&[("project_type", AnswerValue::text("renovation"))]);

        assert!(visibility.evaluate(&extension));
        assert!(!visibility.evaluate(&renovation));
    }

    // =========================================================================
    // StepRegistry::new tests
    // =========================================================================

    #[test]
    fn new_sorts_by_ordinal() {
        let registry = StepRegistry::new(vec![step("b", 2), step("a", 1)]).expect("registry");

        let order: Vec<_> = registry.steps().iter().map(|s| s.id).collect();

        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn new_rejects_duplicate_ordinals_and_ids() {
        assert_eq!(
            StepRegistry::new(vec![step("a", 1), step("b", 1)]),
            Err(SchemaError::DuplicateOrdinal(1))
        );
        assert_eq!(
            StepRegistry::new(vec![step("a", 1), step("a", 2)]),
            Err(SchemaError::DuplicateId("a"))
        );
        assert_eq!(StepRegistry::new(vec![]), Err(SchemaError::Empty));
    }

    // =========================================================================
    // standard registry tests
    // =========================================================================

    #[test]
    fn standard_registry_passes_its_own_checks() {
        let standard = StepRegistry::standard();

        assert_eq!(
            StepRegistry::new(standard.steps().to_vec()),
            Ok(standard.clone())
        );
    }

    #[test]
    fn conditional_steps_hidden_until_answered() {
        let registry = StepRegistry::standard();

        let visible = registry.visible_steps(&FormAnswers::new());

        assert!(!ids(&visible).contains(&"professional_activity"));
        assert!(!ids(&visible).contains(&"terrain"));
        assert!(!ids(&visible).contains(&"landscaping"));
        assert_eq!(ids(&visible).first(), Some(&"client"));
        assert_eq!(ids(&visible).last(), Some(&"contact"));
    }

    #[test]
    fn individual_client_hides_professional_activity() {
        let registry = StepRegistry::standard();
        let answers = answers(&[("client_type", AnswerValue::text("individual"))]);

        assert!(!ids(&registry.visible_steps(&answers)).contains(&"professional_activity"));
    }

    #[test]
    fn construction_reveals_terrain_and_landscaping() {
        let registry = StepRegistry::standard();
        let answers = answers(&[
            ("client_type", AnswerValue::text("professional")),
            ("project_type", AnswerValue::text("construction")),
        ]);

        let visible = ids(&registry.visible_steps(&answers));

        assert!(visible.contains(&"professional_activity"));
        assert!(visible.contains(&"terrain"));
        assert!(visible.contains(&"landscaping"));
    }

    #[test]
    fn visible_steps_is_deterministic() {
        let registry = StepRegistry::standard();
        let answers = answers(&[("project_type", AnswerValue::text("construction"))]);

        assert_eq!(
            registry.visible_steps(&answers),
            registry.visible_steps(&answers)
        );
    }

    // =========================================================================
    // validate_step tests
    // =========================================================================

    #[test]
    fn validate_step_lists_each_missing_field() {
        let registry = StepRegistry::standard();
        let project = registry.step("project").expect("project step");

        let result = registry.validate_step(project, &FormAnswers::new());

        let fields: Vec<_> = result.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["project_type", "floor_area", "levels"]);
    }

    #[test]
    fn validate_step_accepts_complete_answers() {
        let registry = StepRegistry::standard();
        let project = registry.step("project").expect("project step");
        let answers = answers(&[
            ("project_type", AnswerValue::text("construction")),
            ("floor_area", AnswerValue::number(dec!(100))),
            ("levels", AnswerValue::number(1)),
        ]);

        assert!(registry.validate_step(project, &answers).is_valid());
    }

    #[test]
    fn validate_step_rejects_over_allocated_facade() {
        let registry = StepRegistry::standard();
        let facade = registry.step("facade").expect("facade step");
        let answers = answers(&[
            ("facade_area", AnswerValue::number(dec!(200))),
            ("facade_stone_pct", AnswerValue::number(dec!(60))),
            ("facade_plaster_pct", AnswerValue::number(dec!(50))),
        ]);

        let result = registry.validate_step(facade, &answers);

        assert_eq!(
            result.errors(),
            &[ValidationError::new(
                "facade",
                "percentages add up to 110%, more than 100%"
            )]
        );
    }

    #[test]
    fn validate_step_does_not_double_report_bad_share() {
        let registry = StepRegistry::standard();
        let facade = registry.step("facade").expect("facade step");
        let answers = answers(&[
            ("facade_area", AnswerValue::number(dec!(200))),
            ("facade_stone_pct", AnswerValue::text("lots")),
        ]);

        let result = registry.validate_step(facade, &answers);

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].field, "facade_stone_pct");
    }

    // =========================================================================
    // normalize tests
    // =========================================================================

    #[test]
    fn normalize_drops_answers_of_hidden_steps() {
        let registry = StepRegistry::standard();
        let answers = answers(&[
            ("project_type", AnswerValue::text("renovation")),
            ("terrain_type", AnswerValue::text("rocky")),
            ("floor_area", AnswerValue::number(dec!(80))),
            ("not_a_field", AnswerValue::Flag(true)),
        ]);

        let normalized = registry.normalize(&answers);

        assert!(normalized.contains("project_type"));
        assert!(normalized.contains("floor_area"));
        assert!(!normalized.contains("terrain_type"));
        assert!(!normalized.contains("not_a_field"));
    }

    // =========================================================================
    // unmapped_selectors tests
    // =========================================================================

    #[test]
    fn unmapped_selectors_reports_missing_costs() {
        let registry = StepRegistry::standard();
        let table = UnitCostTable::new(
            "sparse",
            NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"),
            vec![UnitCostEntry {
                category: CostCategory::Roof,
                selector: "tile".to_string(),
                unit: PricingUnit::SquareMetre,
                unit_cost: dec!(95),
            }],
        )
        .expect("table");

        let missing = registry.unmapped_selectors(&table);

        assert!(missing.contains(&(CostCategory::Roof, "slate")));
        assert!(missing.contains(&(CostCategory::Facade, "base")));
        assert!(!missing.contains(&(CostCategory::Roof, "tile")));
    }
}
