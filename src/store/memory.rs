use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{BillingStore, StoreError};
use crate::core::{
    BillingDetail, BillingRecord, BillingStatus, SummarySource, SummaryStatus, Waybill,
    WaybillStatus, WaybillSummary,
};
use crate::draft::DraftRecord;

/// Store operations, used to inject faults and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListBillings,
    GetBilling,
    CreateBilling,
    UpdateBilling,
    DeleteBilling,
    ListDetails,
    DetailsFor,
    CreateDetail,
    UpdateDetail,
    DeleteDetail,
    ListWaybills,
    UpdateWaybill,
    ListSummaries,
    UpdateSummary,
    ListDrafts,
    GetDraft,
    CreateDraft,
    DeleteDraft,
}

/// In-memory [`BillingStore`].
///
/// Collections keep insertion order, which stands in for the backend's fetch
/// order. Both summary sources read the same collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    billings: Vec<BillingRecord>,
    details: Vec<BillingDetail>,
    waybills: Vec<Waybill>,
    summaries: Vec<WaybillSummary>,
    drafts: Vec<DraftRecord>,
    next_id: u64,
    faults: HashSet<(Operation, Option<String>)>,
    calls: HashMap<Operation, usize>,
}

impl Inner {
    fn enter(&mut self, op: Operation, key: Option<&str>) -> Result<(), StoreError> {
        *self.calls.entry(op).or_default() += 1;
        let keyed = key.is_some_and(|k| self.faults.contains(&(op, Some(k.to_string()))));
        if keyed || self.faults.contains(&(op, None)) {
            return Err(StoreError::Unavailable(match key {
                Some(k) => format!("{op:?} '{k}' rejected"),
                None => format!("{op:?} rejected"),
            }));
        }
        Ok(())
    }

    fn assign_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    /// Add a waybill to the store.
    pub fn seed_waybill(&self, waybill: Waybill) -> Result<(), StoreError> {
        self.state()?.waybills.push(waybill);
        Ok(())
    }

    /// Add a summary row to the store, assigning an ID if missing.
    pub fn seed_summary(&self, mut summary: WaybillSummary) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if summary.id.is_none() {
            summary.id = Some(state.assign_id("summary"));
        }
        state.summaries.push(summary);
        Ok(())
    }

    /// Make every call of `op` fail, or only calls addressing `key`.
    pub fn fail_on(&self, op: Operation, key: Option<&str>) -> Result<(), StoreError> {
        self.state()?.faults.insert((op, key.map(str::to_string)));
        Ok(())
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) -> Result<(), StoreError> {
        self.state()?.faults.clear();
        Ok(())
    }

    /// Number of calls made to `op`, including failed ones.
    pub fn calls(&self, op: Operation) -> usize {
        self.state()
            .map(|s| s.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Current status of a waybill, if known.
    pub fn waybill_status(&self, waybill_number: &str) -> Option<WaybillStatus> {
        let state = self.state().ok()?;
        state
            .waybills
            .iter()
            .find(|w| w.waybill_number == waybill_number)
            .map(|w| w.status)
    }

    /// Current status of the summary rows for a waybill or sub-waybill
    /// number. `None` if absent.
    pub fn summary_status(&self, waybill_number: &str) -> Option<SummaryStatus> {
        let state = self.state().ok()?;
        state
            .summaries
            .iter()
            .find(|s| summary_matches(s, waybill_number))
            .map(|s| s.status)
    }
}

fn summary_matches(summary: &WaybillSummary, key: &str) -> bool {
    summary.waybill_number == key || summary.sub_waybill_number.as_deref() == Some(key)
}

fn not_found(entity: &'static str, key: &str) -> StoreError {
    StoreError::NotFound {
        entity,
        key: key.to_string(),
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn list_billings(&self) -> Result<Vec<BillingRecord>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::ListBillings, None)?;
        Ok(state.billings.clone())
    }

    async fn get_billing(&self, billing_id: &str) -> Result<Option<BillingRecord>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::GetBilling, Some(billing_id))?;
        Ok(state
            .billings
            .iter()
            .find(|b| b.billing_id == billing_id)
            .cloned())
    }

    async fn create_billing(&self, record: &BillingRecord) -> Result<BillingRecord, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::CreateBilling, Some(&record.billing_id))?;
        if state.billings.iter().any(|b| b.billing_id == record.billing_id) {
            return Err(StoreError::Api {
                status: 409,
                body: format!("billing {} already exists", record.billing_id),
            });
        }
        let mut created = record.clone();
        created.id = Some(state.assign_id("billing"));
        state.billings.push(created.clone());
        Ok(created)
    }

    async fn update_billing(&self, record: &BillingRecord) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::UpdateBilling, Some(&record.billing_id))?;
        let slot = state
            .billings
            .iter_mut()
            .find(|b| b.billing_id == record.billing_id)
            .ok_or_else(|| not_found("billing", &record.billing_id))?;
        let id = slot.id.clone();
        *slot = record.clone();
        slot.id = id;
        Ok(())
    }

    async fn delete_billing(&self, billing_id: &str) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::DeleteBilling, Some(billing_id))?;
        let before = state.billings.len();
        state.billings.retain(|b| b.billing_id != billing_id);
        if state.billings.len() == before {
            return Err(not_found("billing", billing_id));
        }
        Ok(())
    }

    async fn list_details(&self) -> Result<Vec<BillingDetail>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::ListDetails, None)?;
        Ok(state.details.clone())
    }

    async fn details_for(&self, billing_id: &str) -> Result<Vec<BillingDetail>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::DetailsFor, Some(billing_id))?;
        Ok(state
            .details
            .iter()
            .filter(|d| d.billing_id == billing_id)
            .cloned()
            .collect())
    }

    async fn create_detail(&self, detail: &BillingDetail) -> Result<BillingDetail, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::CreateDetail, Some(&detail.waybill_number))?;
        let mut created = detail.clone();
        created.id = Some(state.assign_id("detail"));
        state.details.push(created.clone());
        Ok(created)
    }

    async fn update_detail_status(
        &self,
        detail_id: &str,
        status: BillingStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::UpdateDetail, Some(detail_id))?;
        let detail = state
            .details
            .iter_mut()
            .find(|d| d.id.as_deref() == Some(detail_id))
            .ok_or_else(|| not_found("billing detail", detail_id))?;
        detail.status = status;
        Ok(())
    }

    async fn delete_detail(&self, detail_id: &str) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::DeleteDetail, Some(detail_id))?;
        let before = state.details.len();
        state.details.retain(|d| d.id.as_deref() != Some(detail_id));
        if state.details.len() == before {
            return Err(not_found("billing detail", detail_id));
        }
        Ok(())
    }

    async fn list_waybills(&self) -> Result<Vec<Waybill>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::ListWaybills, None)?;
        Ok(state.waybills.clone())
    }

    async fn update_waybill_status(
        &self,
        waybill_number: &str,
        status: WaybillStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::UpdateWaybill, Some(waybill_number))?;
        let waybill = state
            .waybills
            .iter_mut()
            .find(|w| w.waybill_number == waybill_number)
            .ok_or_else(|| not_found("waybill", waybill_number))?;
        waybill.status = status;
        Ok(())
    }

    async fn list_summaries(
        &self,
        _source: SummarySource,
    ) -> Result<Vec<WaybillSummary>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::ListSummaries, None)?;
        Ok(state.summaries.clone())
    }

    async fn update_summary_status(
        &self,
        waybill_number: &str,
        status: SummaryStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::UpdateSummary, Some(waybill_number))?;
        let mut found = false;
        for summary in state
            .summaries
            .iter_mut()
            .filter(|s| summary_matches(s, waybill_number))
        {
            summary.status = status;
            found = true;
        }
        if !found {
            return Err(not_found("waybill summary", waybill_number));
        }
        Ok(())
    }

    async fn list_drafts(&self) -> Result<Vec<DraftRecord>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::ListDrafts, None)?;
        Ok(state.drafts.clone())
    }

    async fn get_draft(&self, id: &str) -> Result<Option<DraftRecord>, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::GetDraft, Some(id))?;
        Ok(state
            .drafts
            .iter()
            .find(|d| d.id.as_deref() == Some(id))
            .cloned())
    }

    async fn create_draft(&self, draft: &DraftRecord) -> Result<DraftRecord, StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::CreateDraft, Some(&draft.name))?;
        let mut created = draft.clone();
        created.id = Some(state.assign_id("draft"));
        state.drafts.push(created.clone());
        Ok(created)
    }

    async fn delete_draft(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.enter(Operation::DeleteDraft, Some(id))?;
        let before = state.drafts.len();
        state.drafts.retain(|d| d.id.as_deref() != Some(id));
        if state.drafts.len() == before {
            return Err(not_found("draft", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Customer, compute_breakdown};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(id: &str) -> BillingRecord {
        BillingRecord::pending(
            id,
            "SI-1",
            Customer::new("ACME"),
            NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
        )
    }

    #[tokio::test]
    async fn create_assigns_id_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let created = store.create_billing(&record("B0001")).await.unwrap();
        assert!(created.id.is_some());
        let dup = store.create_billing(&record("B0001")).await.unwrap_err();
        assert!(matches!(dup, StoreError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn update_keeps_store_id() {
        let store = MemoryStore::new();
        let created = store.create_billing(&record("B0001")).await.unwrap();
        let mut changed = record("B0001");
        changed.remarks = Some("rush".into());
        store.update_billing(&changed).await.unwrap();
        let fetched = store.get_billing("B0001").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.remarks.as_deref(), Some("rush"));
    }

    #[tokio::test]
    async fn keyed_fault_only_hits_that_key() {
        let store = MemoryStore::new();
        let b = compute_breakdown(dec!(100)).unwrap();
        let d1 = store.create_detail(&BillingDetail::new("B0001", "1-1", &b, 1)).await.unwrap();
        let d2 = store.create_detail(&BillingDetail::new("B0001", "1-2", &b, 2)).await.unwrap();
        let id1 = d1.id.unwrap();
        store.fail_on(Operation::UpdateDetail, Some(&id1)).unwrap();

        assert!(store.update_detail_status(&id1, BillingStatus::Billed).await.is_err());
        store
            .update_detail_status(d2.id.as_deref().unwrap(), BillingStatus::Billed)
            .await
            .unwrap();
        assert_eq!(store.calls(Operation::UpdateDetail), 2);

        store.clear_faults().unwrap();
        store.update_detail_status(&id1, BillingStatus::Billed).await.unwrap();
    }

    #[tokio::test]
    async fn summary_status_matches_sub_numbers() {
        let store = MemoryStore::new();
        store
            .seed_summary(WaybillSummary {
                id: None,
                waybill_number: "100-5".into(),
                sub_waybill_number: Some("100-5A".into()),
                entity_abbreviation: "split-1(ACM)".into(),
                company_name: "ACME".into(),
                amount: dec!(250),
                percentage: dec!(50),
                total_amount: dec!(500),
                status: SummaryStatus::NotBilled,
            })
            .unwrap();
        store
            .update_summary_status("100-5A", SummaryStatus::Billed)
            .await
            .unwrap();
        assert_eq!(store.summary_status("100-5"), Some(SummaryStatus::Billed));
        assert!(store.update_summary_status("9-9", SummaryStatus::Billed).await.is_err());
    }
}
