use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::tax::{TaxBreakdown, money};
use super::types::{BillingDetail, BillingRecord};

/// Financial totals of a billing record.
///
/// Only ever built from [`TaxBreakdown`]s, so the stored record, the on-screen
/// totals and the printed invoice share one computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingTotals {
    pub gross: Decimal,
    pub net: Decimal,
    pub vat: Decimal,
    pub withholding_tax: Decimal,
    pub net_amount: Decimal,
}

impl BillingTotals {
    /// Sum the live detail rows of a billing.
    pub fn from_details(details: &[BillingDetail]) -> Self {
        details
            .iter()
            .map(BillingDetail::breakdown)
            .fold(Self::zero(), |acc, b| acc.plus(&b))
    }

    /// Totals currently stored on a record.
    pub fn of_record(record: &BillingRecord) -> Self {
        Self {
            gross: record.gross,
            net: record.net,
            vat: record.vat,
            withholding_tax: record.withholding_tax,
            net_amount: record.net_amount,
        }
    }

    pub fn zero() -> Self {
        Self {
            gross: money(Decimal::ZERO),
            net: money(Decimal::ZERO),
            vat: money(Decimal::ZERO),
            withholding_tax: money(Decimal::ZERO),
            net_amount: money(Decimal::ZERO),
        }
    }

    fn plus(self, b: &TaxBreakdown) -> Self {
        Self {
            gross: self.gross + b.gross,
            net: self.net + b.net,
            vat: self.vat + b.vat,
            withholding_tax: self.withholding_tax + b.withholding_tax,
            net_amount: self.net_amount + b.net_amount,
        }
    }

    /// Legacy incremental maintenance: add one detail's breakdown.
    pub fn add_detail(self, detail: &BillingDetail) -> Self {
        self.plus(&detail.breakdown())
    }

    /// Legacy incremental maintenance: remove one detail.
    ///
    /// `net_amount` is reduced by the detail's gross `amount`, as the existing
    /// backend data expects. Every field is clamped at zero.
    pub fn remove_detail(self, detail: &BillingDetail) -> Self {
        let clamp = |v: Decimal| money(v.max(Decimal::ZERO));
        Self {
            gross: clamp(self.gross - detail.amount),
            net: clamp(self.net - detail.net),
            vat: clamp(self.vat - detail.vat),
            withholding_tax: clamp(self.withholding_tax - detail.withholding_tax),
            net_amount: clamp(self.net_amount - detail.amount),
        }
    }

    /// Write these totals onto a record.
    pub fn apply_to(&self, record: &mut BillingRecord) {
        record.gross = self.gross;
        record.net = self.net;
        record.vat = self.vat;
        record.withholding_tax = self.withholding_tax;
        record.net_amount = self.net_amount;
    }
}

/// Amount the customer owes on a record.
pub fn amount_due(record: &BillingRecord) -> Decimal {
    record.net_amount
}

/// Remaining balance after a payment and any deducted charge.
pub fn balance(amount_due: Decimal, actual_amount_paid: Decimal, charge_amount: Decimal) -> Decimal {
    amount_due - actual_amount_paid - charge_amount
}
