#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Any outcome is fine as long as parsing never panics, and an
        // accepted range must satisfy the half-open contract.
        if let Ok(range) = zseek::cli::args::parse_range(text) {
            assert!(range.end.map_or(true, |end| end >= range.begin));
        }
    }
});
