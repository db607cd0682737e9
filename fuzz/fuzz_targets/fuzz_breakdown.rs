#![no_main]

use cargobill::core::compute_breakdown;
use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;

fuzz_target!(|cents: i64| {
    let gross = Decimal::new(cents, 2);
    match compute_breakdown(gross) {
        Ok(b) => {
            assert_eq!(b.net + b.vat, b.gross);
            assert_eq!(b.net_amount + b.withholding_tax, b.gross);
        }
        Err(_) => assert!(gross < Decimal::ZERO),
    }
});
