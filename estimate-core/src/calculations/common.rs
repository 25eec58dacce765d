//! Rounding helpers shared by the calculator and the summary renderer.
//!
//! Pricing keeps every amount at full precision; these functions are only
//! applied when a value is presented to a person.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to the nearest whole currency unit, half away from zero.
///
/// This is the rounding applied to a displayed grand total.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::round_to_unit;
///
/// assert_eq!(round_to_unit(dec!(15234.49)), dec!(15234));
/// assert_eq!(round_to_unit(dec!(15234.50)), dec!(15235));
/// ```
pub fn round_to_unit(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage `pct` (0–100) of `amount`, unrounded. `None` on overflow.
pub fn percent_of(
    amount: Decimal,
    pct: Decimal,
) -> Option<Decimal> {
    amount.checked_mul(pct)?.checked_div(Decimal::ONE_HUNDRED)
}
