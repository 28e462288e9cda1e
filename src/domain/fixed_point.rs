//! Fixed-point rounding used across indicators, sizing and analytics.
//!
//! Ratios carry 4 decimal places, currency amounts 2. Both round half-up
//! (midpoint away from zero).

use rust_decimal::{Decimal, RoundingStrategy};

pub const RATIO_SCALE: u32 = 4;
pub const CURRENCY_SCALE: u32 = 2;

pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATIO_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator` rounded to ratio precision.
///
/// The denominator must be non-zero.
pub fn div_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    round_ratio(numerator / denominator)
}
