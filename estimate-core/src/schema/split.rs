//! Percentage splits: one area distributed across several finishes.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::{CostCategory, FormAnswers};

/// A category whose area is shared out between selectors by percentage.
///
/// Whatever share the answers leave unallocated is priced with
/// `base_selector`, so the whole area is always costed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentSplit {
    pub category: CostCategory,
    /// Field holding the area being split.
    pub area_field: &'static str,
    /// `(percentage field, selector)` pairs.
    pub shares: &'static [(&'static str, &'static str)],
    pub base_selector: &'static str,
}

/// Facade finishes, split over `facade_area`.
pub const FACADE_SPLIT: PercentSplit = PercentSplit {
    category: CostCategory::Facade,
    area_field: "facade_area",
    shares: &[
        ("facade_stone_pct", "stone"),
        ("facade_plaster_pct", "plaster"),
        ("facade_brick_pct", "brick"),
        ("facade_wood_pct", "wood"),
    ],
    base_selector: "base",
};

/// Flooring tiers, split over `floor_area`.
pub const FLOORING_SPLIT: PercentSplit = PercentSplit {
    category: CostCategory::Flooring,
    area_field: "floor_area",
    shares: &[
        ("flooring_economy_pct", "economy"),
        ("flooring_standard_pct", "standard"),
        ("flooring_premium_pct", "premium"),
    ],
    base_selector: "base",
};

impl PercentSplit {
    /// The explicit `(selector, percentage)` allocations, in declaration order.
    ///
    /// Unanswered shares are skipped. A negative share, a non-numeric share
    /// or a total above 100 is an error: over-allocation is never
    /// normalised away.
    pub fn allocations(
        &self,
        answers: &FormAnswers,
    ) -> Result<Vec<(&'static str, Decimal)>, ValidationError> {
        let mut allocations = Vec::with_capacity(self.shares.len());
        let mut total = Decimal::ZERO;

        for (field, selector) in self.shares {
            let Some(value) = answers.get(field) else {
                continue;
            };
            let pct = value
                .as_number()
                .ok_or_else(|| ValidationError::new(*field, "must be a percentage"))?;
            if pct < Decimal::ZERO {
                return Err(ValidationError::new(*field, "must not be negative"));
            }
            total = total.checked_add(pct).unwrap_or(Decimal::MAX);
            allocations.push((*selector, pct));
        }

        if total > Decimal::ONE_HUNDRED {
            return Err(ValidationError::new(
                self.category.as_str(),
                format!("percentages add up to {total}%, more than 100%"),
            ));
        }

        Ok(allocations)
    }

    /// Percentage left for the base selector once explicit shares are taken.
    pub fn remainder(
        &self,
        answers: &FormAnswers,
    ) -> Result<Decimal, ValidationError> {
        let allocated: Decimal = self.allocations(answers)?.iter().map(|(_, pct)| *pct).sum();
        Ok(Decimal::ONE_HUNDRED - allocated)
    }

    /// Every selector the split can price, base selector last.
    pub fn selectors(&self) -> impl Iterator<Item = &'static str> {
        self.shares
            .iter()
            .map(|(_, selector)| *selector)
            .chain(std::iter::once(self.base_selector))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::AnswerValue;

    fn facade(shares: &[(&str, Decimal)]) -> FormAnswers {
        shares
            .iter()
            .map(|(field, pct)| (*field, AnswerValue::number(*pct)))
            .collect()
    }

    #[test]
    fn remainder_tops_up_to_one_hundred() {
        let answers = facade(&[
            ("facade_stone_pct", dec!(30)),
            ("facade_plaster_pct", dec!(50)),
            ("facade_brick_pct", dec!(15)),
        ]);

        assert_eq!(FACADE_SPLIT.remainder(&answers), Ok(dec!(5)));
    }

    #[test]
    fn empty_split_leaves_everything_to_base() {
        assert_eq!(FACADE_SPLIT.remainder(&FormAnswers::new()), Ok(dec!(100)));
        assert_eq!(FACADE_SPLIT.allocations(&FormAnswers::new()), Ok(vec![]));
    }

    #[test]
    fn over_allocation_is_rejected() {
        let answers = facade(&[
            ("facade_stone_pct", dec!(60)),
            ("facade_plaster_pct", dec!(50)),
        ]);

        assert_eq!(
            FACADE_SPLIT.allocations(&answers),
            Err(ValidationError::new(
                "facade",
                "percentages add up to 110%, more than 100%"
            ))
        );
    }

    #[test]
    fn shares_beyond_decimal_range_are_over_allocation() {
        let answers = facade(&[
            ("facade_stone_pct", Decimal::MAX),
            ("facade_plaster_pct", Decimal::MAX),
        ]);

        let error = FACADE_SPLIT
            .allocations(&answers)
            .expect_err("over 100%");

        assert_eq!(error.field, "facade");
    }

    #[test]
    fn exactly_one_hundred_is_accepted() {
        let answers = facade(&[("flooring_standard_pct", dec!(100))]);

        assert_eq!(
            FLOORING_SPLIT.allocations(&answers),
            Ok(vec![("standard", dec!(100))])
        );
        assert_eq!(FLOORING_SPLIT.remainder(&answers), Ok(Decimal::ZERO));
    }

    #[test]
    fn negative_share_is_rejected() {
        let answers = facade(&[("facade_wood_pct", dec!(-5))]);

        assert_eq!(
            FACADE_SPLIT.allocations(&answers),
            Err(ValidationError::new("facade_wood_pct", "must not be negative"))
        );
    }

    #[test]
    fn non_numeric_share_is_rejected() {
        let answers: FormAnswers = [("facade_stone_pct", AnswerValue::text("thirty"))]
            .into_iter()
            .collect();

        assert!(FACADE_SPLIT.allocations(&answers).is_err());
    }

    #[test]
    fn selectors_end_with_base() {
        let selectors: Vec<_> = FLOORING_SPLIT.selectors().collect();

        assert_eq!(selectors, vec!["economy", "standard", "premium", "base"]);
    }
}
