use cargobill::availability::AvailabilityResolver;
use cargobill::core::*;
use cargobill::draft::{BillingType, DraftSnapshot, DraftStore, ManualEntry};
use cargobill::store::{BillingStore, MemoryStore};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn customer() -> Customer {
    Customer {
        store_name: "ACM".into(),
        address: Some("12 Dock Road, Pasig".into()),
        tin: Some("123-456-789-000".into()),
        business_style: Some("Retail".into()),
        entity_abbreviation: None,
    }
}

fn entry(rows: u32, description: &str, amount: Decimal) -> ManualEntry {
    ManualEntry {
        rows,
        waybill_number: None,
        description: description.into(),
        amount,
        percentage: Decimal::ZERO,
        cbm: dec!(1.5),
    }
}

fn summary(waybill: &str) -> WaybillSummary {
    WaybillSummary {
        id: None,
        waybill_number: waybill.into(),
        sub_waybill_number: None,
        entity_abbreviation: "ACM".into(),
        company_name: String::new(),
        amount: dec!(500),
        percentage: dec!(100),
        total_amount: dec!(500),
        status: SummaryStatus::NotBilled,
    }
}

#[tokio::test]
async fn manual_draft_round_trip() {
    let store = MemoryStore::new();
    let drafts = DraftStore::new(&store);
    let snapshot = DraftSnapshot {
        billing_type: BillingType::Manual,
        customer: customer(),
        si_number: Some("SI-0042".into()),
        invoice_date: Some(date(2024, 6, 12)),
        due_date: None,
        manual_entries: vec![
            entry(2, "Pallet handling", dec!(250.00)),
            entry(1, "Trucking Manila-Batangas", dec!(4200.00)),
            entry(3, "Overnight storage", dec!(0)),
        ],
        checked_waybills: Vec::new(),
        waybill_order: Vec::new(),
    };

    let id = drafts.save_draft("June manual", snapshot.clone()).await.unwrap();
    let loaded = drafts.load_draft(&id).await.unwrap();

    assert_eq!(loaded.customer, snapshot.customer);
    assert_eq!(loaded.si_number, snapshot.si_number);
    let rows: Vec<u32> = loaded.manual_entries.iter().map(|e| e.rows).collect();
    assert_eq!(rows, vec![1, 2, 3]);
    assert_eq!(loaded.manual_entries[0].description, "Trucking Manila-Batangas");
    assert_eq!(loaded.manual_entries[1].amount, dec!(250.00));
}

#[tokio::test]
async fn waybill_draft_restores_order_and_checks() {
    let store = MemoryStore::new();
    for w in ["500-1", "500-2", "500-3", "500-4"] {
        store.seed_summary(summary(w)).unwrap();
    }
    let drafts = DraftStore::new(&store);
    let snapshot = DraftSnapshot {
        customer: customer(),
        checked_waybills: vec!["500-3".into(), "500-1".into()],
        waybill_order: vec!["500-3".into(), "500-1".into(), "500-2".into()],
        ..DraftSnapshot::default()
    };
    let id = drafts.save_draft("ACM week 24", snapshot).await.unwrap();

    // 500-1 gets billed before the draft is restored.
    let mut rec = BillingRecord::pending("B0001", "SI-1", Customer::new("ACM"), date(2024, 6, 12));
    rec.status = BillingStatus::Billed;
    store.create_billing(&rec).await.unwrap();
    let mut detail = BillingDetail::new("B0001", "500-1", &compute_breakdown(dec!(500)).unwrap(), 1);
    detail.status = BillingStatus::Billed;
    store.create_detail(&detail).await.unwrap();

    let policy = BillingPolicy::default();
    let resolver = AvailabilityResolver::new(&store, &policy);
    let restored = drafts.restore_draft(&id, &resolver).await.unwrap();

    let order: Vec<(&str, bool)> = restored
        .candidates
        .iter()
        .map(|c| (c.candidate.waybill_number.as_str(), c.checked))
        .collect();
    assert_eq!(order, vec![("500-3", true), ("500-2", false), ("500-4", false)]);
    assert_eq!(restored.dropped, vec!["500-1"]);
    assert_eq!(restored.name, "ACM week 24");
}

#[tokio::test]
async fn drafts_listed_newest_first_and_deleted() {
    let store = MemoryStore::new();
    let drafts = DraftStore::new(&store);
    let snapshot = DraftSnapshot {
        customer: customer(),
        ..DraftSnapshot::default()
    };
    let first = drafts.save_draft("first", snapshot.clone()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = drafts.save_draft("second", snapshot).await.unwrap();

    let listed = drafts.list_drafts().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    assert_eq!(listed[0].store_name, "ACM");

    drafts.delete_draft(&first).await.unwrap();
    assert_eq!(drafts.list_drafts().await.unwrap().len(), 1);
    let err = drafts.load_draft(&first).await.unwrap_err();
    assert!(matches!(err, BillingError::NotFound { entity: "draft", .. }));
}

#[tokio::test]
async fn waybill_draft_needs_customer() {
    let store = MemoryStore::new();
    let err = DraftStore::new(&store)
        .save_draft("no customer", DraftSnapshot::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));
    assert!(store.list_drafts().await.unwrap().is_empty());
}
