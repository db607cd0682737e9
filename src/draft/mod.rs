//! Named snapshots of unsaved billing forms.
//!
//! A draft captures enough to rebuild an in-progress billing: customer, manual
//! lines with their row order, the checked waybills, and the order the user
//! arranged the waybill list in. Restoring re-fetches live availability and
//! re-applies the saved selection; waybills billed in the meantime drop out.

mod merge;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::availability::AvailabilityResolver;
use crate::core::{BillingError, Customer, ValidationError, validate_customer};
use crate::store::BillingStore;

pub use merge::{DraftCandidate, merge_candidates};

/// Store-assigned draft identifier.
pub type DraftId = String;

/// What the billing form was billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BillingType {
    /// Lines come from billable waybills.
    #[default]
    Waybill,
    /// Lines are typed in by hand.
    Manual,
}

/// A hand-entered billing line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    /// Position of the line in the form.
    pub rows: u32,
    pub waybill_number: Option<String>,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub percentage: Decimal,
    #[serde(default)]
    pub cbm: Decimal,
}

/// Everything needed to rebuild an in-progress billing form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub billing_type: BillingType,
    pub customer: Customer,
    pub si_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub manual_entries: Vec<ManualEntry>,
    /// Checked waybill numbers.
    #[serde(default)]
    pub checked_waybills: Vec<String>,
    /// Display order of the waybill list, checked or not.
    #[serde(default)]
    pub waybill_order: Vec<String>,
}

/// A persisted draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DraftId>,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub snapshot: DraftSnapshot,
}

/// Listing entry for a draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub id: DraftId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub billing_type: BillingType,
    pub store_name: String,
}

/// A draft re-applied to the waybills billable right now.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredDraft {
    pub id: DraftId,
    pub name: String,
    /// The snapshot, manual entries sorted by `rows`.
    pub snapshot: DraftSnapshot,
    /// Live candidates in saved order, with checked flags re-applied.
    pub candidates: Vec<DraftCandidate>,
    /// Saved waybills no longer billable.
    pub dropped: Vec<String>,
}

/// Draft persistence on top of a [`BillingStore`].
pub struct DraftStore<'a, S: BillingStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: BillingStore + ?Sized> DraftStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Persist a snapshot under `name`. Drafts never expire.
    pub async fn save_draft(
        &self,
        name: &str,
        snapshot: DraftSnapshot,
    ) -> Result<DraftId, BillingError> {
        let errors = validate_draft(name, &snapshot);
        if !errors.is_empty() {
            return Err(BillingError::Validation(errors));
        }

        let record = DraftRecord {
            id: None,
            name: name.trim().to_string(),
            created_at: Utc::now(),
            snapshot,
        };
        let created = self.store.create_draft(&record).await?;
        let id = created
            .id
            .ok_or_else(|| BillingError::not_found("draft id", record.name.clone()))?;
        info!(draft_id = %id, name = %record.name, "draft saved");
        Ok(id)
    }

    /// Load a snapshot; manual entries come back sorted by `rows`.
    pub async fn load_draft(&self, id: &str) -> Result<DraftSnapshot, BillingError> {
        Ok(self.fetch(id).await?.snapshot)
    }

    pub async fn delete_draft(&self, id: &str) -> Result<(), BillingError> {
        self.store.delete_draft(id).await?;
        info!(draft_id = id, "draft deleted");
        Ok(())
    }

    /// All drafts, newest first.
    pub async fn list_drafts(&self) -> Result<Vec<DraftSummary>, BillingError> {
        let mut drafts: Vec<DraftSummary> = self
            .store
            .list_drafts()
            .await?
            .into_iter()
            .filter_map(|d| {
                Some(DraftSummary {
                    id: d.id?,
                    name: d.name,
                    created_at: d.created_at,
                    billing_type: d.snapshot.billing_type,
                    store_name: d.snapshot.customer.store_name,
                })
            })
            .collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    /// Load a draft and re-apply it to the customer's live billable waybills.
    pub async fn restore_draft(
        &self,
        id: &str,
        resolver: &AvailabilityResolver<'_, S>,
    ) -> Result<RestoredDraft, BillingError> {
        let record = self.fetch(id).await?;
        let snapshot = record.snapshot;

        let (candidates, dropped) = match snapshot.billing_type {
            BillingType::Waybill => {
                let live = resolver
                    .list_billable_waybills(&snapshot.customer)
                    .await?;
                merge_candidates(&snapshot, live)
            }
            BillingType::Manual => (Vec::new(), Vec::new()),
        };

        debug!(
            draft_id = id,
            candidates = candidates.len(),
            dropped = dropped.len(),
            "draft restored"
        );

        Ok(RestoredDraft {
            id: id.to_string(),
            name: record.name,
            snapshot,
            candidates,
            dropped,
        })
    }

    async fn fetch(&self, id: &str) -> Result<DraftRecord, BillingError> {
        let mut record = self
            .store
            .get_draft(id)
            .await?
            .ok_or_else(|| BillingError::not_found("draft", id))?;
        record.snapshot.manual_entries.sort_by_key(|e| e.rows);
        Ok(record)
    }
}

fn validate_draft(name: &str, snapshot: &DraftSnapshot) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(ValidationError::with_code(
            "name",
            "draft name must not be empty",
            "required",
        ));
    }

    if snapshot.billing_type == BillingType::Waybill {
        validate_customer(&snapshot.customer, &mut errors);
    }

    for (i, entry) in snapshot.manual_entries.iter().enumerate() {
        if entry.amount < Decimal::ZERO {
            errors.push(ValidationError::with_code(
                format!("manual_entries[{i}].amount"),
                format!("{} must not be negative", entry.amount),
                "negative-amount",
            ));
        }
    }

    let mut rows: Vec<u32> = snapshot.manual_entries.iter().map(|e| e.rows).collect();
    rows.sort_unstable();
    if rows.windows(2).any(|w| w[0] == w[1]) {
        errors.push(ValidationError::with_code(
            "manual_entries",
            "manual entry rows must be unique",
            "duplicate-rows",
        ));
    }

    errors
}
