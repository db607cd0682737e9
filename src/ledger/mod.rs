//! Creating billings, attaching and removing lines, keeping totals in step.

use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::availability::WaybillCandidate;
use crate::cascade::{CascadeReport, CascadeTarget, ItemOutcome, StatusCascade, summary_status};
use crate::core::{
    BillingDetail, BillingError, BillingIdSequence, BillingPolicy, BillingRecord, BillingStatus,
    BillingTotals, Customer, StatusMetadata, TaxBreakdown, TotalsMode, ValidationError,
    compute_breakdown, is_overdue, validate_billing,
};
use crate::draft::ManualEntry;
use crate::store::{BillingStore, StoreError};

/// Header fields of a billing about to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBilling {
    pub si_number: String,
    pub customer: Customer,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

/// A line to attach to a billing.
#[derive(Debug, Clone, PartialEq)]
pub enum LineInput {
    Waybill(WaybillCandidate),
    Manual(ManualEntry),
}

impl LineInput {
    fn waybill_number(&self) -> &str {
        match self {
            Self::Waybill(c) => &c.waybill_number,
            Self::Manual(e) => e.waybill_number.as_deref().unwrap_or(""),
        }
    }

    fn amount(&self) -> rust_decimal::Decimal {
        match self {
            Self::Waybill(c) => c.amount,
            Self::Manual(e) => e.amount,
        }
    }

    fn to_detail(&self, billing_id: &str, breakdown: &TaxBreakdown, rows: u32) -> BillingDetail {
        let mut detail = BillingDetail::new(billing_id, self.waybill_number().trim(), breakdown, rows);
        match self {
            Self::Waybill(c) => {
                detail.percentage = c.percentage;
            }
            Self::Manual(e) => {
                detail.description = Some(e.description.clone());
                detail.percentage = e.percentage;
                detail.cbm = e.cbm;
            }
        }
        detail
    }
}

/// Result of attaching lines: the refreshed record plus per-line failures.
#[derive(Debug, Clone, PartialEq)]
pub struct LinesOutcome {
    pub record: BillingRecord,
    pub created: Vec<BillingDetail>,
    /// Waybill number (or row) and the error of each line that was not saved.
    pub failed: Vec<(String, StoreError)>,
}

impl LinesOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of one overdue transition attempted by [`BillingLedger::mark_overdue`].
#[derive(Debug)]
pub struct OverdueOutcome {
    pub billing_id: String,
    pub result: Result<CascadeReport, BillingError>,
}

/// Billing save flow on top of a [`BillingStore`].
pub struct BillingLedger<'a, S: BillingStore + ?Sized> {
    store: &'a S,
    policy: &'a BillingPolicy,
}

impl<'a, S: BillingStore + ?Sized> BillingLedger<'a, S> {
    pub fn new(store: &'a S, policy: &'a BillingPolicy) -> Self {
        Self { store, policy }
    }

    /// Create a Pending billing with zero financials and the next `B####` ID.
    pub async fn create_billing(&self, new: NewBilling) -> Result<BillingRecord, BillingError> {
        let mut record = BillingRecord::pending("B0001", new.si_number, new.customer, new.invoice_date);
        record.due_date = new.due_date;
        record.remarks = new.remarks;

        let errors = validate_billing(&record);
        if !errors.is_empty() {
            return Err(BillingError::Validation(errors));
        }

        let existing = self.store.list_billings().await?;
        let mut sequence =
            BillingIdSequence::from_existing(existing.iter().map(|b| b.billing_id.as_str()));
        record.billing_id = sequence.next_id()?;

        let created = self.store.create_billing(&record).await?;
        info!(
            billing_id = %created.billing_id,
            store_name = %created.store_name(),
            date_billed = %created.date_billed,
            "billing created"
        );
        Ok(created)
    }

    /// Attach lines after the billing's existing rows and refresh its totals.
    ///
    /// Only Pending billings take new lines; later statuses are projected onto
    /// summaries and waybills by the status cascade. Breakdowns are computed
    /// for every line before anything is written; details are then created
    /// concurrently. Lines that fail to save are reported, the rest stay.
    pub async fn add_lines(
        &self,
        billing_id: &str,
        lines: Vec<LineInput>,
    ) -> Result<LinesOutcome, BillingError> {
        let (record, existing) = futures::try_join!(
            self.store.get_billing(billing_id),
            self.store.details_for(billing_id),
        )?;
        let record = record.ok_or_else(|| BillingError::not_found("billing", billing_id))?;
        if record.status != BillingStatus::Pending {
            return Err(BillingError::Validation(vec![ValidationError::with_code(
                "status",
                format!("billing {billing_id} is {}; lines can only be added while Pending", record.status),
                "billing-not-pending",
            )]));
        }

        let mut errors = Vec::new();
        let mut breakdowns = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            match compute_breakdown(line.amount()) {
                Ok(b) => breakdowns.push(b),
                Err(e) => errors.extend(e.validation_errors().iter().map(|v| {
                    ValidationError {
                        field: format!("lines[{i}].{}", v.field),
                        ..v.clone()
                    }
                })),
            }
            let number = line.waybill_number().trim();
            let on_billing = existing.iter().any(|d| d.waybill_number == number);
            let repeated = lines[..i].iter().any(|l| l.waybill_number().trim() == number);
            if !number.is_empty() && (on_billing || repeated) {
                errors.push(ValidationError::with_code(
                    format!("lines[{i}].waybill_number"),
                    format!("waybill {number} is already on billing {billing_id}"),
                    "duplicate-waybill",
                ));
            }
        }
        if !errors.is_empty() {
            return Err(BillingError::Validation(errors));
        }

        let first_row = existing.iter().map(|d| d.rows).max().unwrap_or(0) + 1;
        let pending: Vec<BillingDetail> = lines
            .iter()
            .zip(&breakdowns)
            .enumerate()
            .map(|(i, (line, breakdown))| {
                line.to_detail(billing_id, breakdown, first_row + i as u32)
            })
            .collect();

        let results = join_all(pending.iter().map(|d| self.store.create_detail(d))).await;

        let mut created = Vec::new();
        let mut failed = Vec::new();
        for (detail, result) in pending.iter().zip(results) {
            match result {
                Ok(saved) => created.push(saved),
                Err(e) => {
                    let key = line_key(detail);
                    warn!(billing_id, line = %key, error = %e, "billing detail not saved");
                    failed.push((key, e));
                }
            }
        }

        let totals = match self.policy.totals_mode {
            TotalsMode::Recompute => {
                BillingTotals::from_details(&self.store.details_for(billing_id).await?)
            }
            TotalsMode::Incremental => created
                .iter()
                .fold(BillingTotals::of_record(&record), |t, d| t.add_detail(d)),
        };
        let record = self.persist_totals(record, totals).await?;

        debug!(
            billing_id,
            created = created.len(),
            failed = failed.len(),
            net_amount = %record.net_amount,
            "lines attached"
        );
        Ok(LinesOutcome {
            record,
            created,
            failed,
        })
    }

    /// Create a billing and attach its lines in one go.
    pub async fn save_billing(
        &self,
        new: NewBilling,
        lines: Vec<LineInput>,
    ) -> Result<LinesOutcome, BillingError> {
        let record = self.create_billing(new).await?;
        self.add_lines(&record.billing_id, lines).await
    }

    /// Delete one detail, refresh the billing's totals and the billed-ness of
    /// the waybill it referenced.
    ///
    /// # Errors
    ///
    /// `PartialCascade` when the detail and totals were updated but the
    /// summary refresh failed.
    pub async fn remove_detail(
        &self,
        billing_id: &str,
        detail_id: &str,
    ) -> Result<BillingRecord, BillingError> {
        let (record, details) = futures::try_join!(
            self.store.get_billing(billing_id),
            self.store.details_for(billing_id),
        )?;
        let record = record.ok_or_else(|| BillingError::not_found("billing", billing_id))?;
        let removed = details
            .iter()
            .find(|d| d.id.as_deref() == Some(detail_id))
            .cloned()
            .ok_or_else(|| BillingError::not_found("billing detail", detail_id))?;

        self.store.delete_detail(detail_id).await?;

        let totals = match self.policy.totals_mode {
            TotalsMode::Recompute => {
                let remaining: Vec<BillingDetail> = details
                    .into_iter()
                    .filter(|d| d.id.as_deref() != Some(detail_id))
                    .collect();
                BillingTotals::from_details(&remaining)
            }
            TotalsMode::Incremental => BillingTotals::of_record(&record).remove_detail(&removed),
        };
        let record = self.persist_totals(record, totals).await?;
        info!(
            billing_id,
            detail_id,
            net_amount = %record.net_amount,
            "billing detail removed"
        );

        let waybill = removed.waybill_number.trim();
        if !waybill.is_empty() {
            let result = match self.store.list_details().await {
                Ok(all) => {
                    // The removed row no longer counts for any billing.
                    let status = summary_status(waybill, "", BillingStatus::Pending, &all);
                    self.store.update_summary_status(waybill, status).await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                warn!(billing_id, waybill, error = %e, "summary refresh failed");
                let mut report = CascadeReport::new(billing_id, record.status);
                report.summaries.push(ItemOutcome::from_result(
                    CascadeTarget::Summary,
                    waybill.to_string(),
                    result,
                ));
                return Err(BillingError::PartialCascade(Box::new(report)));
            }
        }

        Ok(record)
    }

    /// Recompute a billing's totals from its live detail rows and store them.
    pub async fn refresh_totals(&self, billing_id: &str) -> Result<BillingRecord, BillingError> {
        let (record, details) = futures::try_join!(
            self.store.get_billing(billing_id),
            self.store.details_for(billing_id),
        )?;
        let record = record.ok_or_else(|| BillingError::not_found("billing", billing_id))?;
        self.persist_totals(record, BillingTotals::from_details(&details))
            .await
    }

    /// Move every Billed billing past its due date to Overdue.
    pub async fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<OverdueOutcome>, BillingError> {
        let billings = self.store.list_billings().await?;
        let cascade = StatusCascade::new(self.store, self.policy);
        let mut outcomes = Vec::new();
        for record in billings.iter().filter(|b| is_overdue(b, today)) {
            let result = cascade
                .apply(&record.billing_id, BillingStatus::Overdue, &StatusMetadata::default())
                .await;
            outcomes.push(OverdueOutcome {
                billing_id: record.billing_id.clone(),
                result,
            });
        }
        info!(%today, overdue = outcomes.len(), "overdue sweep finished");
        Ok(outcomes)
    }

    async fn persist_totals(
        &self,
        mut record: BillingRecord,
        totals: BillingTotals,
    ) -> Result<BillingRecord, BillingError> {
        if BillingTotals::of_record(&record) != totals {
            totals.apply_to(&mut record);
            self.store.update_billing(&record).await?;
        }
        Ok(record)
    }
}

fn line_key(detail: &BillingDetail) -> String {
    if detail.waybill_number.is_empty() {
        format!("row {}", detail.rows)
    } else {
        detail.waybill_number.clone()
    }
}
