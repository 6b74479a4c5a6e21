#![no_main]

use libfuzzer_sys::fuzz_target;
use neurotrends::formatters::parse_model_json;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_model_json(text);
    }
});
