//! Regulatory and brokerage fee schedule for a reward purchase.
//!
//! All components are computed on the unrounded transaction value
//! (`price × quantity`); only the total is rounded.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::money::round_money;
use crate::error::LedgerError;

/// Brokerage rate applied to the transaction value.
pub const BROKERAGE_RATE: Decimal = dec!(0.0003);
/// Minimum brokerage charged per transaction.
pub const MIN_BROKERAGE: Decimal = dec!(20);
/// Securities transaction tax rate.
pub const STT_RATE: Decimal = dec!(0.00025);
/// Goods and services tax, charged on brokerage.
pub const GST_RATE: Decimal = dec!(0.18);
/// Exchange transaction charge rate.
pub const EXCHANGE_RATE: Decimal = dec!(0.0000325);
/// Regulator turnover fee rate.
pub const REGULATORY_RATE: Decimal = dec!(0.000001);
/// Stamp duty rate.
pub const STAMP_DUTY_RATE: Decimal = dec!(0.00003);

/// Itemized fees for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    /// `price × quantity`.
    pub transaction_value: Decimal,
    /// `max(value × 0.03%, 20)`.
    pub brokerage: Decimal,
    /// Securities transaction tax.
    pub securities_transaction_tax: Decimal,
    /// GST on brokerage.
    pub goods_and_services_tax: Decimal,
    /// Exchange charges.
    pub exchange_charges: Decimal,
    /// Regulatory (turnover) charges.
    pub regulatory_charges: Decimal,
    /// Stamp duty.
    pub stamp_duty: Decimal,
}

impl FeeBreakdown {
    /// Computes every fee component for `quantity` shares at `price`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if either input is negative or
    /// the transaction value does not fit in a [`Decimal`].
    pub fn compute(price: Decimal, quantity: Decimal) -> Result<Self, LedgerError> {
        if price < Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "fee price must be non-negative, got {price}"
            )));
        }
        if quantity < Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "fee quantity must be non-negative, got {quantity}"
            )));
        }

        let value = price.checked_mul(quantity).ok_or_else(|| {
            LedgerError::Validation(format!(
                "transaction value of {quantity} shares at {price} is out of range"
            ))
        })?;
        // Every rate is below one, so the component products cannot overflow.
        let brokerage = (value * BROKERAGE_RATE).max(MIN_BROKERAGE);

        Ok(Self {
            transaction_value: value,
            brokerage,
            securities_transaction_tax: value * STT_RATE,
            goods_and_services_tax: brokerage * GST_RATE,
            exchange_charges: value * EXCHANGE_RATE,
            regulatory_charges: value * REGULATORY_RATE,
            stamp_duty: value * STAMP_DUTY_RATE,
        })
    }

    /// Sum of all components, rounded to 2 decimal places.
    #[must_use]
    pub fn total(&self) -> Decimal {
        round_money(
            self.brokerage
                + self.securities_transaction_tax
                + self.goods_and_services_tax
                + self.exchange_charges
                + self.regulatory_charges
                + self.stamp_duty,
        )
    }
}

/// Total fees for `quantity` shares at `price`, rounded to 2 decimals.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] if either input is negative or the
/// transaction value is out of range.
pub fn calculate_fees(price: Decimal, quantity: Decimal) -> Result<Decimal, LedgerError> {
    FeeBreakdown::compute(price, quantity).map(|breakdown| breakdown.total())
}
