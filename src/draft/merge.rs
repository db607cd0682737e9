use std::collections::{HashMap, HashSet};

use super::DraftSnapshot;
use crate::availability::WaybillCandidate;

/// A live candidate with the draft's checked flag re-applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftCandidate {
    pub candidate: WaybillCandidate,
    pub checked: bool,
}

/// Re-apply a draft's order and checked set onto freshly fetched candidates.
///
/// Candidates named in `waybill_order` come first, in that order; the rest
/// follow in fetch order. Saved numbers that are no longer live are returned
/// separately, each once.
pub fn merge_candidates(
    snapshot: &DraftSnapshot,
    live: Vec<WaybillCandidate>,
) -> (Vec<DraftCandidate>, Vec<String>) {
    let checked: HashSet<&str> = snapshot.checked_waybills.iter().map(String::as_str).collect();

    let mut by_number: HashMap<String, WaybillCandidate> = HashMap::with_capacity(live.len());
    let mut fetch_order = Vec::with_capacity(live.len());
    for candidate in live {
        if !by_number.contains_key(&candidate.waybill_number) {
            fetch_order.push(candidate.waybill_number.clone());
            by_number.insert(candidate.waybill_number.clone(), candidate);
        }
    }

    let mut merged = Vec::with_capacity(by_number.len());
    let mut dropped = Vec::new();
    let mut seen_dropped = HashSet::new();

    for number in &snapshot.waybill_order {
        match by_number.remove(number) {
            Some(candidate) => merged.push(DraftCandidate {
                checked: checked.contains(number.as_str()),
                candidate,
            }),
            None => {
                if !merged.iter().any(|m| &m.candidate.waybill_number == number)
                    && seen_dropped.insert(number.clone())
                {
                    dropped.push(number.clone());
                }
            }
        }
    }

    for number in fetch_order {
        if let Some(candidate) = by_number.remove(&number) {
            merged.push(DraftCandidate {
                checked: checked.contains(number.as_str()),
                candidate,
            });
        }
    }

    for number in &snapshot.checked_waybills {
        let live = merged.iter().any(|m| &m.candidate.waybill_number == number);
        if !live && seen_dropped.insert(number.clone()) {
            dropped.push(number.clone());
        }
    }

    (merged, dropped)
}
