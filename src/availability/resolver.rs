use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entity::{EntityCode, EntityKind};
use crate::core::{
    BillingDetail, BillingError, BillingPolicy, BillingRecord, BillingStatus, Customer, WaybillSummary,
};
use crate::store::BillingStore;

/// A waybill (or waybill portion) that can be added to a billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaybillCandidate {
    /// Number the billing detail will reference: the sub-waybill number for
    /// split and payload portions, the waybill number otherwise.
    pub waybill_number: String,
    /// Parent waybill of a portion.
    pub parent_waybill_number: Option<String>,
    pub kind: EntityKind,
    pub entity_abbreviation: String,
    pub company_name: String,
    pub amount: Decimal,
    pub percentage: Decimal,
    pub total_amount: Decimal,
}

/// Lists billable waybills for a customer.
pub struct AvailabilityResolver<'a, S: BillingStore + ?Sized> {
    store: &'a S,
    policy: &'a BillingPolicy,
}

impl<'a, S: BillingStore + ?Sized> AvailabilityResolver<'a, S> {
    pub fn new(store: &'a S, policy: &'a BillingPolicy) -> Self {
        Self { store, policy }
    }

    /// Waybills `customer` can still be billed for, in fetch order.
    ///
    /// Summary rows match on the customer's entity abbreviation (their base
    /// code) or store name (their company name). Waybills already held by
    /// the customer's non-cancelled billings are left out.
    ///
    /// # Errors
    ///
    /// Any failed fetch yields `BillingError::Resolver`; no partial list is
    /// returned.
    pub async fn list_billable_waybills(
        &self,
        customer: &Customer,
    ) -> Result<Vec<WaybillCandidate>, BillingError> {
        let (summaries, billings, details) = futures::try_join!(
            self.store.list_summaries(self.policy.summary_source),
            self.store.list_billings(),
            self.store.list_details(),
        )
        .map_err(|e| BillingError::Resolver(format!("failed to fetch billing state: {e}")))?;

        let candidates = resolve_candidates(customer, &summaries, &billings, &details);
        debug!(
            store_name = %customer.store_name,
            abbreviation = customer.abbreviation(),
            source = ?self.policy.summary_source,
            summaries = summaries.len(),
            candidates = candidates.len(),
            "resolved billable waybills"
        );
        Ok(candidates)
    }
}

/// Pure core of [`AvailabilityResolver::list_billable_waybills`].
pub fn resolve_candidates(
    customer: &Customer,
    summaries: &[WaybillSummary],
    billings: &[BillingRecord],
    details: &[BillingDetail],
) -> Vec<WaybillCandidate> {
    let abbreviation = customer.abbreviation();
    let store_name = customer.store_name.trim();
    let excluded = consumed_waybills(customer, billings, details);

    let matching: Vec<(&WaybillSummary, EntityCode)> = summaries
        .iter()
        .map(|s| (s, EntityCode::parse(&s.entity_abbreviation)))
        .filter(|(s, code)| {
            code.base.eq_ignore_ascii_case(abbreviation)
                || s.company_name.trim().eq_ignore_ascii_case(store_name)
        })
        .collect();

    // Parents that are billed through their portions, billed or not.
    let split_parents: HashSet<&str> = matching
        .iter()
        .filter(|(s, code)| code.is_portion() && sub_number(s).is_some())
        .map(|(s, _)| s.waybill_number.as_str())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for (summary, code) in &matching {
        let sub = sub_number(summary);
        if excluded.contains(summary.waybill_number.as_str())
            || sub.is_some_and(|n| excluded.contains(n))
        {
            continue;
        }

        let (key, parent) = match sub {
            Some(n) if code.is_portion() => (n, Some(summary.waybill_number.clone())),
            _ => {
                if split_parents.contains(summary.waybill_number.as_str()) {
                    continue;
                }
                (summary.waybill_number.as_str(), None)
            }
        };

        if !seen.insert(key.to_string()) {
            continue;
        }

        candidates.push(WaybillCandidate {
            waybill_number: key.to_string(),
            parent_waybill_number: parent,
            kind: code.kind,
            entity_abbreviation: summary.entity_abbreviation.clone(),
            company_name: summary.company_name.clone(),
            amount: summary.amount,
            percentage: summary.percentage,
            total_amount: summary.total_amount,
        });
    }

    candidates
}

/// Waybill numbers held by the customer's own non-cancelled billings.
fn consumed_waybills<'a>(
    customer: &Customer,
    billings: &[BillingRecord],
    details: &'a [BillingDetail],
) -> HashSet<&'a str> {
    let active_billings: HashSet<&str> = billings
        .iter()
        .filter(|b| b.status != BillingStatus::Cancelled && same_customer(&b.customer, customer))
        .map(|b| b.billing_id.as_str())
        .collect();

    details
        .iter()
        .filter(|d| d.status != BillingStatus::Cancelled)
        .filter(|d| active_billings.contains(d.billing_id.as_str()))
        .map(|d| d.waybill_number.as_str())
        .collect()
}

/// Billings are filed under the store name; older records may only agree on
/// the abbreviation.
fn same_customer(a: &Customer, b: &Customer) -> bool {
    a.store_name.trim().eq_ignore_ascii_case(b.store_name.trim())
        || a.abbreviation().eq_ignore_ascii_case(b.abbreviation())
}

fn sub_number(summary: &WaybillSummary) -> Option<&str> {
    summary
        .sub_waybill_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
}
