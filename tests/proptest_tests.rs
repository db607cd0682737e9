//! Property-based tests for the cargobill crate.
//!
//! Run with: `cargo test --test proptest_tests`

use std::collections::HashSet;

use cargobill::availability::{WaybillCandidate, resolve_candidates};
use cargobill::core::*;
use cargobill::draft::{DraftSnapshot, merge_candidates};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Proptest Strategies ─────────────────────────────────────────────────────

/// Generate a gross amount (0.00 to 999999.99).
fn arb_gross() -> impl Strategy<Value = Decimal> {
    (0u64..100_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

fn arb_status() -> impl Strategy<Value = BillingStatus> {
    prop::sample::select(BillingStatus::ALL.to_vec())
}

/// Waybill numbers drawn from a small pool so collisions happen.
fn arb_waybill() -> impl Strategy<Value = String> {
    (1u32..8).prop_map(|n| format!("700-{n}"))
}

fn arb_company() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["ACM".to_string(), "XYZ".to_string()])
}

fn summary(waybill: &str, company: &str) -> WaybillSummary {
    WaybillSummary {
        id: None,
        waybill_number: waybill.into(),
        sub_waybill_number: None,
        entity_abbreviation: company.into(),
        company_name: String::new(),
        amount: dec!(100),
        percentage: dec!(100),
        total_amount: dec!(100),
        status: SummaryStatus::NotBilled,
    }
}

fn candidate(waybill: &str) -> WaybillCandidate {
    WaybillCandidate {
        waybill_number: waybill.into(),
        parent_waybill_number: None,
        kind: cargobill::availability::EntityKind::Regular,
        entity_abbreviation: "ACM".into(),
        company_name: String::new(),
        amount: dec!(100),
        percentage: dec!(100),
        total_amount: dec!(100),
    }
}

// ── Tax breakdown ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn breakdown_parts_add_up(gross in arb_gross()) {
        let b = compute_breakdown(gross).unwrap();
        prop_assert_eq!(b.net + b.vat, b.gross);
        prop_assert_eq!(b.net_amount + b.withholding_tax, b.gross);
        prop_assert_eq!(b.withholding_tax, money(b.net * dec!(0.02)));
    }

    #[test]
    fn breakdown_never_negative(gross in arb_gross()) {
        let b = compute_breakdown(gross).unwrap();
        for v in [b.net, b.vat, b.withholding_tax, b.net_amount] {
            prop_assert!(v >= Decimal::ZERO);
        }
        prop_assert!(b.net_amount <= b.gross);
    }

    #[test]
    fn negative_gross_always_rejected(cents in 1i64..100_000_000i64) {
        prop_assert!(compute_breakdown(Decimal::new(-cents, 2)).is_err());
    }
}

// ── Totals ──────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn recomputed_totals_ignore_row_order(amounts in prop::collection::vec(arb_gross(), 0..12)) {
        let details: Vec<BillingDetail> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| BillingDetail::new("B0001", format!("700-{i}"), &compute_breakdown(*a).unwrap(), i as u32 + 1))
            .collect();
        let mut reversed = details.clone();
        reversed.reverse();

        let totals = BillingTotals::from_details(&details);
        prop_assert_eq!(totals, BillingTotals::from_details(&reversed));
        prop_assert_eq!(totals.net + totals.vat, totals.gross);
        prop_assert_eq!(totals.net_amount + totals.withholding_tax, totals.gross);
    }

    #[test]
    fn incremental_totals_never_negative(
        amounts in prop::collection::vec(arb_gross(), 1..8),
        removals in prop::collection::vec(0usize..8, 0..12),
    ) {
        let details: Vec<BillingDetail> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| BillingDetail::new("B0001", format!("700-{i}"), &compute_breakdown(*a).unwrap(), i as u32 + 1))
            .collect();
        let mut totals = details
            .iter()
            .fold(BillingTotals::zero(), |t, d| t.add_detail(d));
        for r in removals {
            totals = totals.remove_detail(&details[r % details.len()]);
            for v in [totals.gross, totals.net, totals.vat, totals.withholding_tax, totals.net_amount] {
                prop_assert!(v >= Decimal::ZERO);
            }
        }
    }
}

// ── Availability ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn active_waybills_never_offered(
        summaries in prop::collection::vec((arb_waybill(), arb_company()), 0..16),
        billings in prop::collection::vec((arb_company(), arb_status()), 0..5),
        details in prop::collection::vec((0usize..5, arb_waybill(), arb_status()), 0..12),
        company in arb_company(),
    ) {
        let summaries: Vec<WaybillSummary> = summaries.iter().map(|(w, c)| summary(w, c)).collect();
        let records: Vec<BillingRecord> = billings
            .iter()
            .enumerate()
            .map(|(i, (c, status))| {
                let mut rec = BillingRecord::pending(
                    format!("B{:04}", i + 1),
                    "SI-1",
                    Customer::new(c.as_str()),
                    NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
                );
                rec.status = *status;
                rec
            })
            .collect();
        let rows: Vec<BillingDetail> = details
            .iter()
            .filter(|(b, _, _)| *b < records.len())
            .enumerate()
            .map(|(i, (b, w, status))| {
                let mut d = BillingDetail::new(
                    records[*b].billing_id.clone(),
                    w.as_str(),
                    &compute_breakdown(dec!(100)).unwrap(),
                    i as u32 + 1,
                );
                // A detail follows its billing unless it was cancelled on its own.
                d.status = if *status == BillingStatus::Cancelled { *status } else { records[*b].status };
                d
            })
            .collect();

        let offered = resolve_candidates(&Customer::new(company.as_str()), &summaries, &records, &rows);

        let active: HashSet<&str> = rows
            .iter()
            .filter(|d| d.status != BillingStatus::Cancelled)
            .filter(|d| {
                records.iter().any(|r| {
                    r.billing_id == d.billing_id
                        && r.status != BillingStatus::Cancelled
                        && r.store_name() == company
                })
            })
            .map(|d| d.waybill_number.as_str())
            .collect();
        for c in &offered {
            prop_assert!(!active.contains(c.waybill_number.as_str()), "{} offered", c.waybill_number);
        }

        let unique: HashSet<&str> = offered.iter().map(|c| c.waybill_number.as_str()).collect();
        prop_assert_eq!(unique.len(), offered.len());
    }
}

// ── Draft merge ─────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_keeps_every_live_candidate_once(
        live in prop::collection::vec(arb_waybill(), 0..10),
        order in prop::collection::vec(arb_waybill(), 0..10),
        checked in prop::collection::vec(arb_waybill(), 0..5),
    ) {
        let snapshot = DraftSnapshot {
            customer: Customer::new("ACM"),
            checked_waybills: checked.clone(),
            waybill_order: order.clone(),
            ..DraftSnapshot::default()
        };
        let live_set: HashSet<&str> = live.iter().map(String::as_str).collect();
        let (merged, dropped) =
            merge_candidates(&snapshot, live.iter().map(|w| candidate(w)).collect());

        let merged_set: HashSet<&str> = merged.iter().map(|m| m.candidate.waybill_number.as_str()).collect();
        prop_assert_eq!(merged.len(), merged_set.len());
        prop_assert_eq!(&merged_set, &live_set);

        let dropped_set: HashSet<&str> = dropped.iter().map(String::as_str).collect();
        prop_assert_eq!(dropped.len(), dropped_set.len());
        prop_assert!(dropped_set.is_disjoint(&live_set));
        prop_assert!(dropped.iter().all(|w| order.contains(w) || checked.contains(w)));

        for m in &merged {
            prop_assert_eq!(m.checked, checked.contains(&m.candidate.waybill_number));
        }
    }
}
