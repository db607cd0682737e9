//! Printable service invoice built from a billing and its detail rows.
//!
//! The document takes its totals from [`BillingTotals::from_details`], the
//! same computation the ledger persists, and refuses a record whose stored
//! totals disagree with its lines.

#[cfg(feature = "pdf")]
mod pdf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::{
    BillingDetail, BillingError, BillingRecord, BillingStatus, BillingTotals, ChargeType, Customer,
};

#[cfg(feature = "pdf")]
pub use pdf::render_pdf;

/// One printed invoice line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub rows: u32,
    pub waybill_number: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub percentage: Decimal,
    pub cbm: Decimal,
}

/// Layout model of a service invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDocument {
    pub billing_id: String,
    pub si_number: String,
    pub customer: Customer,
    pub invoice_date: NaiveDate,
    pub date_billed: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: BillingStatus,
    pub lines: Vec<InvoiceLine>,
    pub totals: BillingTotals,
    pub charge_type: ChargeType,
    pub charge_amount: Decimal,
    pub remarks: Option<String>,
}

/// Compose the invoice for `record` from its detail rows.
///
/// # Errors
///
/// `BillingError::Document` if a detail belongs to another billing or the
/// record's stored totals differ from the sum of its lines.
pub fn compose_invoice(
    record: &BillingRecord,
    details: &[BillingDetail],
) -> Result<InvoiceDocument, BillingError> {
    if let Some(foreign) = details.iter().find(|d| d.billing_id != record.billing_id) {
        return Err(BillingError::Document(format!(
            "detail for waybill {} belongs to billing {}, not {}",
            foreign.waybill_number, foreign.billing_id, record.billing_id
        )));
    }

    let totals = BillingTotals::from_details(details);
    let stored = BillingTotals::of_record(record);
    if stored != totals {
        return Err(BillingError::Document(format!(
            "billing {} stores net amount {} but its lines sum to {}; refresh totals first",
            record.billing_id, stored.net_amount, totals.net_amount
        )));
    }

    let mut rows: Vec<&BillingDetail> = details.iter().collect();
    rows.sort_by_key(|d| d.rows);
    let lines = rows
        .into_iter()
        .map(|d| InvoiceLine {
            rows: d.rows,
            waybill_number: d.waybill_number.clone(),
            description: d.description.clone(),
            amount: d.amount,
            percentage: d.percentage,
            cbm: d.cbm,
        })
        .collect();

    Ok(InvoiceDocument {
        billing_id: record.billing_id.clone(),
        si_number: record.si_number.clone(),
        customer: record.customer.clone(),
        invoice_date: record.invoice_date,
        date_billed: record.date_billed,
        due_date: record.due_date,
        status: record.status,
        lines,
        totals,
        charge_type: record.charge_type,
        charge_amount: record.charge_amount,
        remarks: record.remarks.clone(),
    })
}

impl InvoiceDocument {
    /// Amount the customer pays: net amount less any deducted charge.
    pub fn amount_payable(&self) -> Decimal {
        self.totals.net_amount - self.charge_amount
    }

    /// Deterministic text layout, one string per printed line.
    pub fn text_lines(&self) -> Vec<String> {
        let mut out = vec![
            format!("SERVICE INVOICE {}", self.si_number),
            format!("Billing ID: {}", self.billing_id),
            format!("Customer: {}", self.customer.store_name),
        ];
        if let Some(address) = &self.customer.address {
            out.push(format!("Address: {address}"));
        }
        if let Some(tin) = &self.customer.tin {
            out.push(format!("TIN: {tin}"));
        }
        if let Some(style) = &self.customer.business_style {
            out.push(format!("Business style: {style}"));
        }
        out.push(format!("Invoice date: {}", self.invoice_date));
        out.push(format!("Date billed: {}", self.date_billed));
        if let Some(due) = self.due_date {
            out.push(format!("Due date: {due}"));
        }
        out.push(String::new());
        out.push(format!("{:<4}{:<16}{:<28}{:>12}", "#", "Waybill", "Description", "Amount"));
        for line in &self.lines {
            out.push(format!(
                "{:<4}{:<16}{:<28}{:>12}",
                line.rows,
                line.waybill_number,
                truncate(line.description.as_deref().unwrap_or(""), 27),
                line.amount
            ));
        }
        out.push(String::new());
        out.push(total_line("Gross sales", self.totals.gross));
        out.push(total_line("Less VAT (12%)", self.totals.vat));
        out.push(total_line("Net of VAT", self.totals.net));
        out.push(total_line("Less withholding tax (2%)", self.totals.withholding_tax));
        out.push(total_line("Amount due", self.totals.net_amount));
        if self.charge_type != ChargeType::None {
            out.push(total_line(charge_label(self.charge_type), self.charge_amount));
            out.push(total_line("Amount payable", self.amount_payable()));
        }
        if let Some(remarks) = &self.remarks {
            out.push(String::new());
            out.push(format!("Remarks: {remarks}"));
        }
        out
    }
}

fn total_line(label: &str, value: Decimal) -> String {
    format!("{label:<48}{value:>12}")
}

fn charge_label(charge: ChargeType) -> &'static str {
    match charge {
        ChargeType::None => "Charges",
        ChargeType::Damages => "Less damages",
        ChargeType::OtherCharges => "Less other charges",
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
