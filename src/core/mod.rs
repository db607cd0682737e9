//! Core billing types, tax computation, totals, numbering and validation.
//!
//! Everything here is pure: no store access, no logging.

mod dates;
mod error;
mod numbering;
mod policy;
mod tax;
mod totals;
mod types;
mod validation;

pub use dates::*;
pub use error::*;
pub use numbering::*;
pub use policy::*;
pub use tax::*;
pub use totals::*;
pub use types::*;
pub use validation::*;
