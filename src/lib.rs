//! # cargobill
//!
//! Billing core for a cargo trucking back office: invoice tax breakdowns,
//! billing totals, status cascades across billing details, waybill summaries
//! and waybills, billable-waybill resolution, billing drafts, and printable
//! invoices.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! The backend is an external REST collaborator without transactions, so every
//! multi-entity operation is best-effort and reports per-item outcomes.
//!
//! ## Quick Start
//!
//! ```rust
//! use cargobill::core::*;
//! use rust_decimal_macros::dec;
//!
//! let breakdown = compute_breakdown(dec!(1000.00)).unwrap();
//! assert_eq!(breakdown.net, dec!(892.86));
//! assert_eq!(breakdown.vat, dec!(107.14));
//! assert_eq!(breakdown.withholding_tax, dec!(17.86));
//! assert_eq!(breakdown.net_amount, dec!(982.14));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Domain types, tax, cascade, availability, drafts, ledger, invoice layout |
//! | `http` | REST `BillingStore` client and settings loader |
//! | `pdf` | PDF rendering of composed invoices |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod store;

#[cfg(feature = "core")]
pub mod cascade;

#[cfg(feature = "core")]
pub mod availability;

#[cfg(feature = "core")]
pub mod draft;

#[cfg(feature = "core")]
pub mod ledger;

#[cfg(feature = "core")]
pub mod document;

#[cfg(feature = "http")]
pub mod settings;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
