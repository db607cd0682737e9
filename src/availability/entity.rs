use serde::{Deserialize, Serialize};

/// How a waybill's amount is attributed to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The whole waybill belongs to one entity.
    Regular,
    /// The amount is split across several entities.
    Split,
    /// A payload portion of the waybill.
    Payload,
}

/// Decoded entity abbreviation of a summary row.
///
/// Summary rows carry either a plain abbreviation (`ACM`) or an encoded one
/// (`split-2(ACM)`, `payload-1(ACM)`); the base abbreviation is whatever sits
/// between the parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCode {
    pub kind: EntityKind,
    /// Portion index from `split-N` / `payload-N`.
    pub index: Option<u32>,
    pub base: String,
}

impl EntityCode {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (Some(open), Some(close)) = (raw.find('('), raw.rfind(')')) else {
            return Self::regular(raw);
        };
        if close < open {
            return Self::regular(raw);
        }

        let base = raw[open + 1..close].trim().to_string();
        let prefix = raw[..open].trim().to_ascii_lowercase();
        let (label, index) = match prefix.split_once('-') {
            Some((label, n)) => (label.trim().to_string(), n.trim().parse().ok()),
            None => (prefix.clone(), None),
        };
        let kind = match label.as_str() {
            "split" => EntityKind::Split,
            "payload" => EntityKind::Payload,
            _ => EntityKind::Regular,
        };

        Self { kind, index, base }
    }

    fn regular(raw: &str) -> Self {
        Self {
            kind: EntityKind::Regular,
            index: None,
            base: raw.to_string(),
        }
    }

    /// Split and payload portions are billed under their own sub-number.
    pub fn is_portion(&self) -> bool {
        matches!(self.kind, EntityKind::Split | EntityKind::Payload)
    }
}
