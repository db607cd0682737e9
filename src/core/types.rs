use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::tax::TaxBreakdown;

/// Lifecycle status of a billing record and, mirrored, of its details.
///
/// Transitions form a free graph: any status may be reassigned to any other,
/// subject only to the guards enforced by the status cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingStatus {
    Pending,
    Billed,
    Paid,
    Overdue,
    Cancelled,
}

impl BillingStatus {
    pub const ALL: [BillingStatus; 5] = [
        Self::Pending,
        Self::Billed,
        Self::Paid,
        Self::Overdue,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Billed => "Billed",
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Billed and Paid details make their waybill count as billed.
    pub fn counts_as_billed(&self) -> bool {
        matches!(self, Self::Billed | Self::Paid)
    }
}

impl std::fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billed-ness of a waybill summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryStatus {
    #[serde(rename = "BILLED")]
    Billed,
    #[serde(rename = "NOT BILLED")]
    NotBilled,
}

/// Usage status of a physical waybill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaybillStatus {
    #[serde(rename = "UNUSED")]
    Unused,
    #[serde(rename = "USED")]
    Used,
}

/// Additional charge deducted at payment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChargeType {
    #[default]
    None,
    Damages,
    #[serde(rename = "Other Charges")]
    OtherCharges,
}

/// Billed customer as printed on the service invoice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub store_name: String,
    pub address: Option<String>,
    pub tin: Option<String>,
    pub business_style: Option<String>,
    /// Entity abbreviation used on waybill summaries, when it differs from
    /// the store name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_abbreviation: Option<String>,
}

impl Customer {
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            ..Self::default()
        }
    }

    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.entity_abbreviation = Some(abbreviation.into());
        self
    }

    /// Abbreviation summaries are keyed by; the store name when none is set.
    pub fn abbreviation(&self) -> &str {
        self.entity_abbreviation
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.store_name.trim())
    }
}

/// A billing (service invoice) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    /// Store-assigned identifier, absent until created.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Business identifier, `B####`.
    #[serde(rename = "billingID")]
    pub billing_id: String,
    /// Service invoice number.
    pub si_number: String,
    #[serde(flatten)]
    pub customer: Customer,
    pub invoice_date: NaiveDate,
    /// Third Monday after the invoice date.
    pub date_billed: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub gross: Decimal,
    pub vat: Decimal,
    pub net: Decimal,
    #[serde(rename = "withTax")]
    pub withholding_tax: Decimal,
    pub net_amount: Decimal,
    pub status: BillingStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub actual_amount_paid: Option<Decimal>,
    #[serde(default)]
    pub charge_type: ChargeType,
    #[serde(default)]
    pub charge_amount: Decimal,
    pub receipt_number: Option<String>,
    pub remarks: Option<String>,
}

impl BillingRecord {
    /// A freshly created Pending record with zero financials.
    pub fn pending(
        billing_id: impl Into<String>,
        si_number: impl Into<String>,
        customer: Customer,
        invoice_date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            billing_id: billing_id.into(),
            si_number: si_number.into(),
            customer,
            invoice_date,
            date_billed: super::dates::date_billed(invoice_date),
            due_date: None,
            gross: Decimal::ZERO,
            vat: Decimal::ZERO,
            net: Decimal::ZERO,
            withholding_tax: Decimal::ZERO,
            net_amount: Decimal::ZERO,
            status: BillingStatus::Pending,
            paid_at: None,
            actual_amount_paid: None,
            charge_type: ChargeType::None,
            charge_amount: Decimal::ZERO,
            receipt_number: None,
            remarks: None,
        }
    }

    pub fn store_name(&self) -> &str {
        &self.customer.store_name
    }
}

/// One line of a billing record, referencing a single waybill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetail {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "billingID")]
    pub billing_id: String,
    pub waybill_number: String,
    /// Free text for manual entries.
    pub description: Option<String>,
    /// Gross amount of the line.
    pub amount: Decimal,
    pub vat: Decimal,
    pub net: Decimal,
    #[serde(rename = "withTax")]
    pub withholding_tax: Decimal,
    pub net_amount: Decimal,
    #[serde(default)]
    pub percentage: Decimal,
    #[serde(default)]
    pub cbm: Decimal,
    pub status: BillingStatus,
    /// Manual ordering index within the billing.
    pub rows: u32,
}

impl BillingDetail {
    /// Build a detail whose financial fields come from `breakdown`.
    pub fn new(
        billing_id: impl Into<String>,
        waybill_number: impl Into<String>,
        breakdown: &TaxBreakdown,
        rows: u32,
    ) -> Self {
        Self {
            id: None,
            billing_id: billing_id.into(),
            waybill_number: waybill_number.into(),
            description: None,
            amount: breakdown.gross,
            vat: breakdown.vat,
            net: breakdown.net,
            withholding_tax: breakdown.withholding_tax,
            net_amount: breakdown.net_amount,
            percentage: Decimal::ZERO,
            cbm: Decimal::ZERO,
            status: BillingStatus::Pending,
            rows,
        }
    }

    /// The breakdown stored on this row.
    pub fn breakdown(&self) -> TaxBreakdown {
        TaxBreakdown {
            gross: self.amount,
            net: self.net,
            vat: self.vat,
            withholding_tax: self.withholding_tax,
            net_amount: self.net_amount,
        }
    }
}

/// A physical waybill issued from a stub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waybill {
    pub waybill_number: String,
    pub stub: String,
    pub status: WaybillStatus,
    pub assigned_vehicle: Option<String>,
}

/// Per-company amount summary for a waybill (entity-abbreviation summary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaybillSummary {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub waybill_number: String,
    pub sub_waybill_number: Option<String>,
    /// Entity code, possibly encoded as `split-N(ABBR)` or `payload-N(ABBR)`.
    pub entity_abbreviation: String,
    #[serde(default)]
    pub company_name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub percentage: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    pub status: SummaryStatus,
}

/// A waybill number in `stub-number` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaybillNumber {
    pub stub: String,
    pub number: String,
}

impl WaybillNumber {
    /// Parse `stub-number`; both halves must be non-empty.
    pub fn parse(value: &str) -> Option<Self> {
        let (stub, number) = value.trim().split_once('-')?;
        if stub.is_empty() || number.is_empty() {
            return None;
        }
        Some(Self {
            stub: stub.to_string(),
            number: number.to_string(),
        })
    }
}

impl std::fmt::Display for WaybillNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.stub, self.number)
    }
}

/// Extra data supplied with a status change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMetadata {
    pub paid_at: Option<DateTime<Utc>>,
    pub actual_amount_paid: Option<Decimal>,
    pub charge_type: Option<ChargeType>,
    pub charge_amount: Option<Decimal>,
    pub receipt_number: Option<String>,
    pub remarks: Option<String>,
}

impl StatusMetadata {
    pub fn paid(paid_at: DateTime<Utc>, actual_amount_paid: Decimal) -> Self {
        Self {
            paid_at: Some(paid_at),
            actual_amount_paid: Some(actual_amount_paid),
            ..Self::default()
        }
    }

    pub fn with_charge(mut self, charge_type: ChargeType, amount: Decimal) -> Self {
        self.charge_type = Some(charge_type);
        self.charge_amount = Some(amount);
        self
    }

    pub fn with_receipt(mut self, receipt_number: impl Into<String>) -> Self {
        self.receipt_number = Some(receipt_number.into());
        self
    }
}
