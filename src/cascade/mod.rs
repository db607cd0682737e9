//! Status changes of a billing and the dependent updates they trigger.
//!
//! Changing a billing's status also sets the status of its details, the
//! billed-ness of the waybill summaries they reference, and the usage status
//! of the physical waybills. Each of those is a separate store call; they are
//! fanned out concurrently per entity type and reported item by item.

mod report;

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::{
    BillingDetail, BillingError, BillingPolicy, BillingRecord, BillingStatus, BillingTotals,
    CancelledWaybillPolicy, StatusMetadata, SummaryStatus, WaybillStatus, WaybillSummary,
    validate_status_metadata, verify_settlement,
};
use crate::store::{BillingStore, StoreError};

pub use report::{CascadeReport, CascadeTarget, ItemOutcome};

/// Applies billing status changes and their cascade.
pub struct StatusCascade<'a, S: BillingStore + ?Sized> {
    store: &'a S,
    policy: &'a BillingPolicy,
}

impl<'a, S: BillingStore + ?Sized> StatusCascade<'a, S> {
    pub fn new(store: &'a S, policy: &'a BillingPolicy) -> Self {
        Self { store, policy }
    }

    /// Move `billing_id` to `new_status` and cascade to its dependents.
    ///
    /// Any status may be reassigned to any other. Guards:
    /// - Billed (and Paid, unless disabled by policy) needs at least one detail.
    /// - Paid needs `paid_at` and `actual_amount_paid`, and the payment plus
    ///   charge must settle the amount due exactly.
    ///
    /// # Errors
    ///
    /// `Validation` before any store call for bad metadata, after fetching for
    /// guard failures; `Network` if fetching or updating the billing record
    /// fails (nothing is cascaded then); `PartialCascade` if some dependent
    /// updates failed. Succeeded updates are never rolled back.
    pub async fn apply(
        &self,
        billing_id: &str,
        new_status: BillingStatus,
        meta: &StatusMetadata,
    ) -> Result<CascadeReport, BillingError> {
        let errors = validate_status_metadata(new_status, meta);
        if !errors.is_empty() {
            return Err(BillingError::Validation(errors));
        }

        let (record, details) = futures::try_join!(
            self.store.get_billing(billing_id),
            self.store.details_for(billing_id),
        )?;
        let record = record.ok_or_else(|| BillingError::not_found("billing", billing_id))?;

        self.check_guards(&record, &details, new_status, meta)?;

        let mut updated = record;
        updated.status = new_status;
        apply_metadata(&mut updated, meta);
        self.store.update_billing(&updated).await?;

        let report = self.fan_out(billing_id, new_status, &details).await;
        if report.is_complete() {
            info!(
                billing_id,
                status = %new_status,
                updates = report.len(),
                "status cascade complete"
            );
            Ok(report)
        } else {
            warn!(
                billing_id,
                status = %new_status,
                failed = report.failures().count(),
                updates = report.len(),
                "status cascade partially failed"
            );
            Err(BillingError::PartialCascade(Box::new(report)))
        }
    }

    fn check_guards(
        &self,
        record: &BillingRecord,
        details: &[BillingDetail],
        new_status: BillingStatus,
        meta: &StatusMetadata,
    ) -> Result<(), BillingError> {
        let needs_details = match new_status {
            BillingStatus::Billed => true,
            BillingStatus::Paid => self.policy.require_details_for_paid,
            _ => false,
        };
        if needs_details && details.is_empty() {
            return Err(BillingError::invalid(
                "details",
                "no-details",
                format!("billing {} has no billing details", record.billing_id),
            ));
        }

        if new_status == BillingStatus::Paid {
            // Settle against what the invoice prints: the stored totals, and
            // only while they agree with the lines.
            if !details.is_empty() {
                let lines = BillingTotals::from_details(details);
                if lines != BillingTotals::of_record(record) {
                    return Err(BillingError::invalid(
                        "net_amount",
                        "totals-out-of-sync",
                        format!(
                            "billing {} stores net amount {} but its lines sum to {}; refresh totals first",
                            record.billing_id, record.net_amount, lines.net_amount
                        ),
                    ));
                }
            }
            let amount_due = record.net_amount;
            let paid = meta.actual_amount_paid.unwrap_or(Decimal::ZERO);
            let charge = meta.charge_amount.unwrap_or(record.charge_amount);
            verify_settlement(amount_due, paid, charge)?;
        }

        Ok(())
    }

    async fn fan_out(
        &self,
        billing_id: &str,
        new_status: BillingStatus,
        details: &[BillingDetail],
    ) -> CascadeReport {
        let mut report = CascadeReport::new(billing_id, new_status);

        let waybill_numbers = distinct_waybills(details);

        // Billed-ness is derived from the details of every billing, so the
        // projection needs the full picture, not just this billing's rows.
        let (all_details, summaries) = futures::join!(
            self.store.list_details(),
            self.store.list_summaries(self.policy.summary_source),
        );

        let detail_updates = join_all(details.iter().map(|d| async move {
            let Some(id) = d.id.clone() else {
                let key = d.waybill_number.clone();
                return ItemOutcome::from_result(
                    CascadeTarget::Detail,
                    key.clone(),
                    Err(StoreError::NotFound {
                        entity: "billing detail id",
                        key,
                    }),
                );
            };
            let result = self.store.update_detail_status(&id, new_status).await;
            ItemOutcome::from_result(CascadeTarget::Detail, id, result)
        }));

        let summary_updates = async {
            match &all_details {
                Ok(all) => {
                    join_all(waybill_numbers.iter().map(|w| async move {
                        let status = summary_status(w, billing_id, new_status, all);
                        let result = self.store.update_summary_status(w, status).await;
                        ItemOutcome::from_result(CascadeTarget::Summary, w.to_string(), result)
                    }))
                    .await
                }
                Err(e) => waybill_numbers
                    .iter()
                    .map(|w| {
                        ItemOutcome::from_result(CascadeTarget::Summary, w.to_string(), Err(e.clone()))
                    })
                    .collect(),
            }
        };

        let waybill_updates = async {
            let parents = match &summaries {
                Ok(rows) => parent_waybills(rows),
                Err(e) => {
                    warn!(billing_id, error = %e, "summaries unavailable, updating waybills by detail number");
                    HashMap::new()
                }
            };
            let physical = physical_waybills(&waybill_numbers, &parents);
            // Releasing a waybill depends on who else holds it.
            let releasing = new_status == BillingStatus::Cancelled
                && matches!(self.policy.cancelled_waybills, CancelledWaybillPolicy::Release);
            join_all(physical.into_iter().filter_map(|w| {
                let status = match &all_details {
                    Ok(all) => Ok(self.waybill_status(new_status, billed_elsewhere(&w, billing_id, all))?),
                    Err(e) if releasing => Err(e.clone()),
                    Err(_) => Ok(self.waybill_status(new_status, false)?),
                };
                Some(async move {
                    let result = match status {
                        Ok(status) => self.store.update_waybill_status(&w, status).await,
                        Err(e) => Err(e),
                    };
                    ItemOutcome::from_result(CascadeTarget::Waybill, w, result)
                })
            }))
            .await
        };

        let (details_out, summaries_out, waybills_out) =
            futures::join!(detail_updates, summary_updates, waybill_updates);

        for outcome in details_out
            .iter()
            .chain(&summaries_out)
            .chain(&waybills_out)
        {
            if let Some(error) = &outcome.error {
                warn!(
                    billing_id,
                    target = ?outcome.target,
                    key = %outcome.key,
                    %error,
                    "cascade update failed"
                );
            }
        }

        report.details = details_out;
        report.summaries = summaries_out;
        report.waybills = waybills_out;
        report
    }

    /// Waybill status for a billing status, `None` to leave it unchanged.
    fn waybill_status(&self, status: BillingStatus, billed_elsewhere: bool) -> Option<WaybillStatus> {
        match status {
            BillingStatus::Billed | BillingStatus::Paid => Some(WaybillStatus::Used),
            BillingStatus::Cancelled => match self.policy.cancelled_waybills {
                CancelledWaybillPolicy::KeepUsed => Some(WaybillStatus::Used),
                CancelledWaybillPolicy::Release if billed_elsewhere => Some(WaybillStatus::Used),
                CancelledWaybillPolicy::Release => Some(WaybillStatus::Unused),
            },
            BillingStatus::Pending | BillingStatus::Overdue => None,
        }
    }
}

/// Copy the supplied payment fields onto the record.
fn apply_metadata(record: &mut BillingRecord, meta: &StatusMetadata) {
    if let Some(paid_at) = meta.paid_at {
        record.paid_at = Some(paid_at);
    }
    if let Some(paid) = meta.actual_amount_paid {
        record.actual_amount_paid = Some(paid);
    }
    if let Some(charge_type) = meta.charge_type {
        record.charge_type = charge_type;
    }
    if let Some(amount) = meta.charge_amount {
        record.charge_amount = amount;
    }
    if let Some(receipt) = &meta.receipt_number {
        record.receipt_number = Some(receipt.clone());
    }
    if let Some(remarks) = &meta.remarks {
        record.remarks = Some(remarks.clone());
    }
}

/// Distinct non-blank waybill numbers, in row order.
fn distinct_waybills(details: &[BillingDetail]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut rows: Vec<&BillingDetail> = details.iter().collect();
    rows.sort_by_key(|d| d.rows);
    rows.into_iter()
        .map(|d| d.waybill_number.trim())
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

/// Billed-ness of a waybill once `billing_id` holds `new_status`.
///
/// BILLED iff some Billed or Paid detail references the waybill; the details
/// of `billing_id` count at their new status.
pub fn summary_status(
    waybill_number: &str,
    billing_id: &str,
    new_status: BillingStatus,
    all_details: &[BillingDetail],
) -> SummaryStatus {
    if new_status.counts_as_billed() || billed_elsewhere(waybill_number, billing_id, all_details) {
        SummaryStatus::Billed
    } else {
        SummaryStatus::NotBilled
    }
}

fn billed_elsewhere(waybill_number: &str, billing_id: &str, all_details: &[BillingDetail]) -> bool {
    all_details.iter().any(|d| {
        d.billing_id != billing_id
            && d.waybill_number.trim() == waybill_number
            && d.status.counts_as_billed()
    })
}

/// Sub-waybill number to parent waybill number.
fn parent_waybills(summaries: &[WaybillSummary]) -> HashMap<String, String> {
    summaries
        .iter()
        .filter_map(|s| {
            let sub = s.sub_waybill_number.as_deref()?.trim();
            (!sub.is_empty() && sub != s.waybill_number)
                .then(|| (sub.to_string(), s.waybill_number.clone()))
        })
        .collect()
}

/// Physical waybills behind the billed numbers; portions map to their parent.
fn physical_waybills(numbers: &[String], parents: &HashMap<String, String>) -> Vec<String> {
    let mut seen = HashSet::new();
    numbers
        .iter()
        .map(|n| parents.get(n).unwrap_or(n).clone())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}
