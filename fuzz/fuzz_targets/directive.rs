#![no_main]

use bcctest_core::{Expectation, parse_expectation};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Sources are read lossily by discovery, so do the same here
    let source = String::from_utf8_lossy(data);
    if let Some(expectation) = parse_expectation(&source) {
        if source.contains("// FAIL") {
            assert_eq!(expectation, Expectation::CompileFailure);
        }
    }
});
