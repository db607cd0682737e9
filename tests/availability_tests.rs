use cargobill::availability::{AvailabilityResolver, EntityCode, EntityKind};
use cargobill::cascade::StatusCascade;
use cargobill::core::*;
use cargobill::ledger::{BillingLedger, LineInput, NewBilling};
use cargobill::store::{BillingStore, MemoryStore, Operation};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn summary(waybill: &str, sub: Option<&str>, entity: &str, company: &str, amount: Decimal) -> WaybillSummary {
    WaybillSummary {
        id: None,
        waybill_number: waybill.into(),
        sub_waybill_number: sub.map(str::to_string),
        entity_abbreviation: entity.into(),
        company_name: company.into(),
        amount,
        percentage: dec!(100),
        total_amount: amount,
        status: SummaryStatus::NotBilled,
    }
}

async fn billing_with(store: &MemoryStore, billing_id: &str, company: &str, status: BillingStatus, waybills: &[&str]) {
    let mut rec = BillingRecord::pending(
        billing_id,
        "SI-1",
        Customer::new(company),
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
    );
    rec.status = status;
    store.create_billing(&rec).await.unwrap();
    let breakdown = compute_breakdown(dec!(500)).unwrap();
    for (i, w) in waybills.iter().enumerate() {
        let mut d = BillingDetail::new(billing_id, *w, &breakdown, i as u32 + 1);
        d.status = status;
        store.create_detail(&d).await.unwrap();
    }
}

fn numbers(candidates: &[cargobill::availability::WaybillCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.waybill_number.as_str()).collect()
}

#[tokio::test]
async fn active_billings_consume_their_waybills() {
    let store = MemoryStore::new();
    for w in ["200-1", "200-2", "200-3", "200-4"] {
        store
            .seed_summary(summary(w, None, "ACM", "Acme Retail", dec!(500)))
            .unwrap();
    }
    billing_with(&store, "B0001", "ACM", BillingStatus::Billed, &["200-1"]).await;
    billing_with(&store, "B0002", "ACM", BillingStatus::Cancelled, &["200-2"]).await;
    billing_with(&store, "B0003", "OTHER", BillingStatus::Billed, &["200-3"]).await;

    let policy = BillingPolicy::default();
    let candidates = AvailabilityResolver::new(&store, &policy)
        .list_billable_waybills(&Customer::new("ACM"))
        .await
        .unwrap();

    assert_eq!(numbers(&candidates), vec!["200-2", "200-3", "200-4"]);
}

#[tokio::test]
async fn portions_listed_under_sub_number() {
    let store = MemoryStore::new();
    store
        .seed_summary(summary("300-1", None, "split-1(ACM)", "", dec!(1000)))
        .unwrap();
    store
        .seed_summary(summary("300-1", Some("300-1A"), "split-1(ACM)", "", dec!(600)))
        .unwrap();
    store
        .seed_summary(summary("300-1", Some("300-1B"), "split-2(ACM)", "", dec!(400)))
        .unwrap();
    store
        .seed_summary(summary("300-2", Some("300-2P"), "payload-1(ACM)", "", dec!(200)))
        .unwrap();
    billing_with(&store, "B0001", "ACM", BillingStatus::Pending, &["300-1B"]).await;

    let policy = BillingPolicy::default();
    let candidates = AvailabilityResolver::new(&store, &policy)
        .list_billable_waybills(&Customer::new("acm"))
        .await
        .unwrap();

    assert_eq!(numbers(&candidates), vec!["300-1A", "300-2P"]);
    assert_eq!(candidates[0].parent_waybill_number.as_deref(), Some("300-1"));
    assert_eq!(candidates[0].kind, EntityKind::Split);
    assert_eq!(candidates[0].amount, dec!(600));
    assert_eq!(candidates[1].kind, EntityKind::Payload);
}

#[tokio::test]
async fn matches_company_name_and_ignores_others() {
    let store = MemoryStore::new();
    store
        .seed_summary(summary("400-1", None, "XYZ", "Acme Retail", dec!(500)))
        .unwrap();
    store
        .seed_summary(summary("400-2", None, "XYZ", "Xyz Foods", dec!(500)))
        .unwrap();
    store
        .seed_summary(summary("400-1", None, "XYZ", "Acme Retail", dec!(500)))
        .unwrap();

    let policy = BillingPolicy::default();
    let candidates = AvailabilityResolver::new(&store, &policy)
        .list_billable_waybills(&Customer::new(" ACME RETAIL "))
        .await
        .unwrap();
    assert_eq!(numbers(&candidates), vec!["400-1"]);
}

#[tokio::test]
async fn billed_waybills_hidden_when_store_name_differs_from_abbreviation() {
    let store = MemoryStore::new();
    for w in ["600-1", "600-2"] {
        store.seed_summary(summary(w, None, "ACM", "", dec!(500))).unwrap();
        store
            .seed_waybill(Waybill {
                waybill_number: w.into(),
                stub: "600".into(),
                status: WaybillStatus::Unused,
                assigned_vehicle: None,
            })
            .unwrap();
    }
    let customer = Customer::new("Acme Retail").with_abbreviation("ACM");
    let policy = BillingPolicy::default();
    let resolver = AvailabilityResolver::new(&store, &policy);

    let lines = resolver
        .list_billable_waybills(&customer)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.waybill_number == "600-1")
        .map(LineInput::Waybill)
        .collect();
    let outcome = BillingLedger::new(&store, &policy)
        .save_billing(
            NewBilling {
                si_number: "SI-1".into(),
                customer: customer.clone(),
                invoice_date: NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
                due_date: None,
                remarks: None,
            },
            lines,
        )
        .await
        .unwrap();
    StatusCascade::new(&store, &policy)
        .apply(&outcome.record.billing_id, BillingStatus::Billed, &StatusMetadata::default())
        .await
        .unwrap();

    let after = resolver.list_billable_waybills(&customer).await.unwrap();
    assert_eq!(numbers(&after), vec!["600-2"]);
    let by_abbreviation = resolver
        .list_billable_waybills(&Customer::new("ACM"))
        .await
        .unwrap();
    assert_eq!(numbers(&by_abbreviation), vec!["600-2"]);
}

#[tokio::test]
async fn failed_fetch_is_resolver_error() {
    let store = MemoryStore::new();
    store.fail_on(Operation::ListDetails, None).unwrap();
    let policy = BillingPolicy::default();
    let err = AvailabilityResolver::new(&store, &policy)
        .list_billable_waybills(&Customer::new("ACM"))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Resolver(_)), "{err}");
}

#[test]
fn entity_codes() {
    let plain = EntityCode::parse("ACM");
    assert_eq!(plain.kind, EntityKind::Regular);
    assert_eq!(plain.base, "ACM");
    assert!(!plain.is_portion());

    let split = EntityCode::parse("split-2(ACM)");
    assert_eq!(split.kind, EntityKind::Split);
    assert_eq!(split.index, Some(2));
    assert_eq!(split.base, "ACM");

    let payload = EntityCode::parse(" Payload-1 ( ACM ) ");
    assert_eq!(payload.kind, EntityKind::Payload);
    assert_eq!(payload.base, "ACM");
}
