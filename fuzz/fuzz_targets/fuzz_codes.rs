#![no_main]

use cargobill::availability::EntityCode;
use cargobill::core::{WaybillNumber, parse_billing_id};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let code = EntityCode::parse(s);
        assert!(code.is_portion() || code.index.is_none() || s.contains('('));
        let _ = WaybillNumber::parse(s);
        if let Some(n) = parse_billing_id(s) {
            assert!(n <= 9_999);
        }
    }
});
