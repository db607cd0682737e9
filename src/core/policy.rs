use serde::{Deserialize, Serialize};

/// How a billing record's totals are maintained when details change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsMode {
    /// Re-sum the live detail rows after every mutation.
    #[default]
    Recompute,
    /// Apply per-detail deltas to the stored totals, clamped at zero.
    Incremental,
}

/// Waybill status applied when a billing is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledWaybillPolicy {
    /// Cancelled billings still mark their waybills USED.
    #[default]
    KeepUsed,
    /// Cancelled billings release their waybills back to UNUSED.
    Release,
}

/// Which summary collection the availability resolver reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// `/entity-abbreviation-summary`
    #[default]
    EntityAbbreviation,
    /// `/waybillSummary`
    WaybillSummary,
}

/// Business rules threaded through ledger, cascade and resolver calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingPolicy {
    pub totals_mode: TotalsMode,
    pub cancelled_waybills: CancelledWaybillPolicy,
    pub summary_source: SummarySource,
    /// Refuse Paid on a billing without details.
    pub require_details_for_paid: bool,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            totals_mode: TotalsMode::Recompute,
            cancelled_waybills: CancelledWaybillPolicy::KeepUsed,
            summary_source: SummarySource::EntityAbbreviation,
            require_details_for_paid: true,
        }
    }
}
