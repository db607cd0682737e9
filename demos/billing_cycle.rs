use cargobill::availability::AvailabilityResolver;
use cargobill::cascade::StatusCascade;
use cargobill::core::*;
use cargobill::document::compose_invoice;
use cargobill::ledger::{BillingLedger, LineInput, NewBilling};
use cargobill::store::{BillingStore, MemoryStore};
use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn summary(waybill: &str, sub: Option<&str>, entity: &str, amount: rust_decimal::Decimal) -> WaybillSummary {
    WaybillSummary {
        id: None,
        waybill_number: waybill.into(),
        sub_waybill_number: sub.map(str::to_string),
        entity_abbreviation: entity.into(),
        company_name: "Acme Retail".into(),
        amount,
        percentage: dec!(100),
        total_amount: amount,
        status: SummaryStatus::NotBilled,
    }
}

#[tokio::main]
async fn main() -> Result<(), BillingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Seed the store with two whole waybills and one split in two
    let store = MemoryStore::new();
    for number in ["100-4", "100-5", "100-6"] {
        store.seed_waybill(Waybill {
            waybill_number: number.into(),
            stub: "100".into(),
            status: WaybillStatus::Unused,
            assigned_vehicle: Some("TRK-07".into()),
        })?;
    }
    store.seed_summary(summary("100-4", None, "ACM", dec!(500.00)))?;
    store.seed_summary(summary("100-5", None, "ACM", dec!(500.00)))?;
    store.seed_summary(summary("100-6", Some("100-6A"), "split-1(ACM)", dec!(300.00)))?;
    store.seed_summary(summary("100-6", Some("100-6B"), "split-2(XYZ)", dec!(200.00)))?;

    let policy = BillingPolicy::default();
    let resolver = AvailabilityResolver::new(&store, &policy);
    let ledger = BillingLedger::new(&store, &policy);
    let cascade = StatusCascade::new(&store, &policy);

    let customer = Customer::new("Acme Retail").with_abbreviation("ACM");
    let candidates = resolver.list_billable_waybills(&customer).await?;
    println!("Billable for ACM:");
    for c in &candidates {
        println!("  {:<8} {:?} {}", c.waybill_number, c.kind, c.amount);
    }

    let invoice_date = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap_or_default();
    let outcome = ledger
        .save_billing(
            NewBilling {
                si_number: "SI-0100".into(),
                customer: customer.clone(),
                invoice_date,
                due_date: invoice_date.checked_add_days(chrono::Days::new(30)),
                remarks: None,
            },
            candidates.into_iter().map(LineInput::Waybill).collect(),
        )
        .await?;
    let billing_id = outcome.record.billing_id.clone();
    println!(
        "\nCreated {billing_id}: gross {} net amount {} (billed on {})",
        outcome.record.gross, outcome.record.net_amount, outcome.record.date_billed
    );

    cascade
        .apply(&billing_id, BillingStatus::Billed, &StatusMetadata::default())
        .await?;

    let record = store
        .get_billing(&billing_id)
        .await?
        .ok_or_else(|| BillingError::NotFound {
            entity: "billing",
            key: billing_id.clone(),
        })?;
    let due = amount_due(&record);
    let charge = dec!(25.00);
    let paid = due - charge;
    if let Err(e) = verify_settlement(due, paid, charge) {
        println!("Payment does not settle: {e}");
        return Ok(());
    }
    let meta = StatusMetadata::paid(Utc::now(), paid)
        .with_charge(ChargeType::Damages, charge)
        .with_receipt("OR-2024-0001");
    let report = cascade.apply(&billing_id, BillingStatus::Paid, &meta).await?;
    println!("\nPaid cascade updated {} entities", report.len());

    let record = store
        .get_billing(&billing_id)
        .await?
        .ok_or_else(|| BillingError::NotFound {
            entity: "billing",
            key: billing_id.clone(),
        })?;
    let details = store.details_for(&billing_id).await?;
    let invoice = compose_invoice(&record, &details)?;
    println!();
    for line in invoice.text_lines() {
        println!("{line}");
    }

    println!("\nWaybill 100-6: {:?}", store.waybill_status("100-6"));
    println!("Still billable for ACM: {}", resolver.list_billable_waybills(&customer).await?.len());
    Ok(())
}
