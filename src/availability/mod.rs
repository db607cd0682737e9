//! Resolution of the waybills a customer can still be billed for.

mod entity;
mod resolver;

pub use entity::{EntityCode, EntityKind};
pub use resolver::{AvailabilityResolver, WaybillCandidate, resolve_candidates};
