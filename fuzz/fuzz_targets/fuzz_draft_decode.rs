#![no_main]

use std::collections::HashSet;

use cargobill::draft::{DraftRecord, merge_candidates};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed payloads must fail to decode, never panic.
    if let Ok(record) = serde_json::from_slice::<DraftRecord>(data) {
        let snapshot = &record.snapshot;
        let (merged, dropped) = merge_candidates(snapshot, Vec::new());
        assert!(merged.is_empty());

        // Every saved number is reported at most once, whether it was
        // ordered, checked or both.
        let saved: HashSet<&String> = snapshot
            .waybill_order
            .iter()
            .chain(&snapshot.checked_waybills)
            .collect();
        assert!(dropped.len() <= saved.len());
        assert!(dropped.iter().all(|n| saved.contains(n)));
    }
});
