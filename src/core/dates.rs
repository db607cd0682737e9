use chrono::{Datelike, Days, NaiveDate, Weekday};

use super::types::{BillingRecord, BillingStatus};

/// Date a billing is considered billed: the third Monday after the invoice
/// date. A Monday invoice date does not count as the first Monday.
pub fn date_billed(invoice_date: NaiveDate) -> NaiveDate {
    let days_from_monday = invoice_date.weekday().num_days_from_monday() as u64;
    let first_monday = invoice_date + Days::new(7 - days_from_monday);
    first_monday + Days::new(14)
}

/// A Billed record past its due date.
pub fn is_overdue(record: &BillingRecord, today: NaiveDate) -> bool {
    record.status == BillingStatus::Billed && record.due_date.is_some_and(|due| due < today)
}

/// True if `date` falls on a Monday.
pub fn is_monday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}
