//! VAT and withholding-tax breakdown of gross billing amounts.
//!
//! Gross amounts are VAT-inclusive at 12%. The creditable withholding tax is
//! 2% of the VAT-exclusive amount and is deducted from what the customer pays.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::BillingError;

/// Divisor extracting the VAT-exclusive amount from a VAT-inclusive gross.
pub const VAT_DIVISOR: Decimal = dec!(1.12);

/// Creditable withholding tax rate applied to the VAT-exclusive amount.
pub const WITHHOLDING_RATE: Decimal = dec!(0.02);

/// Tax breakdown of one gross amount. Every field carries exactly 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub gross: Decimal,
    /// VAT-exclusive amount: `gross / 1.12`.
    pub net: Decimal,
    /// `gross - net`.
    pub vat: Decimal,
    /// `net * 0.02`.
    pub withholding_tax: Decimal,
    /// Amount due from the customer: `gross - withholding_tax`.
    pub net_amount: Decimal,
}

/// Compute the breakdown of a gross amount.
///
/// Every intermediate is rounded half-up to 2 decimals, and the withholding
/// tax is taken from the rounded `net`, so `net + vat == gross` and
/// `net_amount + withholding_tax == gross` hold exactly.
///
/// # Errors
///
/// Returns `BillingError::Validation` for a negative gross.
pub fn compute_breakdown(gross: Decimal) -> Result<TaxBreakdown, BillingError> {
    if gross < Decimal::ZERO {
        return Err(BillingError::invalid(
            "gross",
            "negative-amount",
            format!("gross amount {gross} must not be negative"),
        ));
    }

    let gross = money(gross);
    let net = money(gross / VAT_DIVISOR);
    let vat = money(gross - net);
    let withholding_tax = money(net * WITHHOLDING_RATE);
    let net_amount = money(gross - withholding_tax);

    Ok(TaxBreakdown {
        gross,
        net,
        vat,
        withholding_tax,
        net_amount,
    })
}

/// Round half-up (commercial rounding) to 2 decimals and fix the scale at 2.
pub fn money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
