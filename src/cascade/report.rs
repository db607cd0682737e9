use serde::Serialize;

use crate::core::BillingStatus;
use crate::store::StoreError;

/// Kind of entity touched by a cascade update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeTarget {
    Detail,
    Summary,
    Waybill,
}

/// Outcome of one dependent update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub target: CascadeTarget,
    /// Detail ID, or waybill number for summaries and waybills.
    pub key: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<StoreError>,
}

impl ItemOutcome {
    pub(crate) fn from_result(target: CascadeTarget, key: String, result: Result<(), StoreError>) -> Self {
        Self {
            target,
            key,
            error: result.err(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<StoreError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Per-item result of a status cascade.
///
/// Updates that succeeded stay applied even when others failed; the store
/// has no transactions to roll them back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeReport {
    pub billing_id: String,
    pub status: BillingStatus,
    pub details: Vec<ItemOutcome>,
    pub summaries: Vec<ItemOutcome>,
    pub waybills: Vec<ItemOutcome>,
}

impl CascadeReport {
    pub(crate) fn new(billing_id: impl Into<String>, status: BillingStatus) -> Self {
        Self {
            billing_id: billing_id.into(),
            status,
            details: Vec::new(),
            summaries: Vec::new(),
            waybills: Vec::new(),
        }
    }

    /// All outcomes, details first.
    pub fn outcomes(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.details
            .iter()
            .chain(&self.summaries)
            .chain(&self.waybills)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes().filter(|o| !o.is_ok())
    }

    /// Total number of dependent updates attempted.
    pub fn len(&self) -> usize {
        self.details.len() + self.summaries.len() + self.waybills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every dependent update succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}
