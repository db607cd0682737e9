use rust_decimal::Decimal;

use super::error::ValidationError;
use super::numbering::parse_billing_id;
use super::totals::balance;
use super::types::*;

/// Validate a billing record before it is persisted.
/// Returns all validation errors found (not just the first).
pub fn validate_billing(record: &BillingRecord) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if parse_billing_id(&record.billing_id).is_none() {
        errors.push(ValidationError::with_code(
            "billing_id",
            format!("billing ID '{}' must have the form B####", record.billing_id),
            "billing-id-format",
        ));
    }

    if record.si_number.trim().is_empty() {
        errors.push(ValidationError::with_code(
            "si_number",
            "service invoice number must not be empty",
            "required",
        ));
    }

    validate_customer(&record.customer, &mut errors);

    let money_fields = [
        ("gross", record.gross),
        ("vat", record.vat),
        ("net", record.net),
        ("withholding_tax", record.withholding_tax),
        ("net_amount", record.net_amount),
        ("charge_amount", record.charge_amount),
    ];
    for (field, value) in money_fields {
        if value < Decimal::ZERO {
            errors.push(ValidationError::with_code(
                field,
                format!("{value} must not be negative"),
                "negative-amount",
            ));
        }
    }

    if record.charge_type == ChargeType::None && !record.charge_amount.is_zero() {
        errors.push(ValidationError::with_code(
            "charge_amount",
            "charge amount requires a charge type",
            "charge-without-type",
        ));
    }

    if let Some(due) = record.due_date {
        if due < record.invoice_date {
            errors.push(ValidationError::with_code(
                "due_date",
                format!("due date {due} is before invoice date {}", record.invoice_date),
                "due-before-invoice",
            ));
        }
    }

    errors
}

/// Validate customer fields shared by billings and drafts.
pub fn validate_customer(customer: &Customer, errors: &mut Vec<ValidationError>) {
    if customer.store_name.trim().is_empty() {
        errors.push(ValidationError::with_code(
            "customer.store_name",
            "customer name must not be empty",
            "required",
        ));
    }
}

/// Check that a payment settles the amount due exactly.
///
/// `amount_due - actual_amount_paid - charge_amount` must be zero. Billing
/// screens run this before requesting Paid; the status cascade runs it again.
pub fn verify_settlement(
    amount_due: Decimal,
    actual_amount_paid: Decimal,
    charge_amount: Decimal,
) -> Result<(), ValidationError> {
    let remaining = balance(amount_due, actual_amount_paid, charge_amount);
    if remaining.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::with_code(
            "actual_amount_paid",
            format!(
                "balance must be zero: due {amount_due} - paid {actual_amount_paid} - charge {charge_amount} = {remaining}"
            ),
            "balance-not-zero",
        ))
    }
}

/// Validate metadata accompanying a status change. Needs no store access.
pub fn validate_status_metadata(status: BillingStatus, meta: &StatusMetadata) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if status == BillingStatus::Paid {
        if meta.paid_at.is_none() {
            errors.push(ValidationError::with_code(
                "paid_at",
                "payment date is required to mark a billing Paid",
                "required",
            ));
        }
        match meta.actual_amount_paid {
            None => errors.push(ValidationError::with_code(
                "actual_amount_paid",
                "amount paid is required to mark a billing Paid",
                "required",
            )),
            Some(paid) if paid < Decimal::ZERO => errors.push(ValidationError::with_code(
                "actual_amount_paid",
                format!("{paid} must not be negative"),
                "negative-amount",
            )),
            Some(_) => {}
        }
    }

    if let Some(charge) = meta.charge_amount {
        if charge < Decimal::ZERO {
            errors.push(ValidationError::with_code(
                "charge_amount",
                format!("{charge} must not be negative"),
                "negative-amount",
            ));
        }
        if meta.charge_type.unwrap_or_default() == ChargeType::None && !charge.is_zero() {
            errors.push(ValidationError::with_code(
                "charge_amount",
                "charge amount requires a charge type",
                "charge-without-type",
            ));
        }
    }

    errors
}
