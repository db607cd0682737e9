use super::error::BillingError;

const PREFIX: char = 'B';
const WIDTH: usize = 4;
const MAX: u32 = 9_999;

/// Billing ID sequence generator.
///
/// Generates IDs in the format `B####`, e.g. "B0001", "B0002". The store has
/// no sequence primitive, so a sequence is seeded from the IDs already in use.
#[derive(Debug, Clone)]
pub struct BillingIdSequence {
    next_number: u32,
}

impl BillingIdSequence {
    /// Create a new sequence starting at B0001.
    pub fn new() -> Self {
        Self { next_number: 1 }
    }

    /// Continue after the highest well-formed ID in `existing`.
    /// Malformed IDs are ignored.
    pub fn from_existing<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let highest = existing
            .into_iter()
            .filter_map(parse_billing_id)
            .max()
            .unwrap_or(0);
        Self {
            next_number: highest + 1,
        }
    }

    /// Generate the next billing ID.
    pub fn next_id(&mut self) -> Result<String, BillingError> {
        let id = self.peek()?;
        self.next_number += 1;
        Ok(id)
    }

    /// Preview the next ID without consuming it.
    pub fn peek(&self) -> Result<String, BillingError> {
        if self.next_number > MAX {
            return Err(BillingError::Numbering(format!(
                "billing ID sequence exhausted after {PREFIX}{MAX}"
            )));
        }
        Ok(format!("{PREFIX}{:0>WIDTH$}", self.next_number))
    }
}

impl Default for BillingIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the numeric part of a `B####` billing ID.
pub fn parse_billing_id(id: &str) -> Option<u32> {
    let digits = id.strip_prefix(PREFIX)?;
    if digits.len() != WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
