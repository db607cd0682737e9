//! The billing backend as seen by this crate.
//!
//! The backend is a REST service with plain CRUD semantics: no transactions,
//! no optimistic concurrency, last write wins. [`BillingStore`] is the seam;
//! [`MemoryStore`] backs tests and demos, `HttpStore` (feature `http`) talks
//! to the real service.

mod memory;

#[cfg(feature = "http")]
mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{
    BillingDetail, BillingRecord, BillingStatus, SummarySource, SummaryStatus, Waybill,
    WaybillStatus, WaybillSummary,
};
use crate::draft::DraftRecord;

pub use memory::{MemoryStore, Operation};

#[cfg(feature = "http")]
pub use http::HttpStore;

/// Errors from a billing store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Connection, timeout or transport failure.
    #[error("request failed: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The addressed entity does not exist.
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// The store refused the call (e.g. injected fault).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// CRUD access to billings, details, waybills, summaries and drafts.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn list_billings(&self) -> Result<Vec<BillingRecord>, StoreError>;

    /// Look up a billing record by its `B####` billing ID.
    async fn get_billing(&self, billing_id: &str) -> Result<Option<BillingRecord>, StoreError>;

    /// Create a record; returns it with the store-assigned `id`.
    async fn create_billing(&self, record: &BillingRecord) -> Result<BillingRecord, StoreError>;

    /// Replace a record, addressed by its billing ID.
    async fn update_billing(&self, record: &BillingRecord) -> Result<(), StoreError>;

    async fn delete_billing(&self, billing_id: &str) -> Result<(), StoreError>;

    async fn list_details(&self) -> Result<Vec<BillingDetail>, StoreError>;

    async fn details_for(&self, billing_id: &str) -> Result<Vec<BillingDetail>, StoreError>;

    async fn create_detail(&self, detail: &BillingDetail) -> Result<BillingDetail, StoreError>;

    async fn update_detail_status(
        &self,
        detail_id: &str,
        status: BillingStatus,
    ) -> Result<(), StoreError>;

    async fn delete_detail(&self, detail_id: &str) -> Result<(), StoreError>;

    async fn list_waybills(&self) -> Result<Vec<Waybill>, StoreError>;

    async fn update_waybill_status(
        &self,
        waybill_number: &str,
        status: WaybillStatus,
    ) -> Result<(), StoreError>;

    async fn list_summaries(&self, source: SummarySource)
    -> Result<Vec<WaybillSummary>, StoreError>;

    /// Set the status of every summary row for a waybill (or sub-waybill) number.
    async fn update_summary_status(
        &self,
        waybill_number: &str,
        status: SummaryStatus,
    ) -> Result<(), StoreError>;

    async fn list_drafts(&self) -> Result<Vec<DraftRecord>, StoreError>;

    async fn get_draft(&self, id: &str) -> Result<Option<DraftRecord>, StoreError>;

    async fn create_draft(&self, draft: &DraftRecord) -> Result<DraftRecord, StoreError>;

    async fn delete_draft(&self, id: &str) -> Result<(), StoreError>;
}
