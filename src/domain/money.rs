//! Monetary rounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places used for every reported monetary amount.
pub const MONEY_DP: u32 = 2;

/// Rounds to [`MONEY_DP`] places, midpoints away from zero (`2.345 → 2.35`).
///
/// `Decimal::round_dp` rounds half-to-even, which is not what fee schedules
/// and statements use.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(2.325)), dec!(2.33));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn keeps_short_values() {
        assert_eq!(round_money(dec!(23.9135)), dec!(23.91));
        assert_eq!(round_money(dec!(7)), dec!(7));
    }
}
