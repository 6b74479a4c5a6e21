#![no_main]

use libfuzzer_sys::fuzz_target;
use neurotrends::models::{OpenAlexWork, PaperRecord, reconstruct_abstract};

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // Input lines go through the same path as the pipeline.
        if let Ok(record) = PaperRecord::from_json_line(line) {
            assert!(!record.year.to_string().is_empty());
        }
    }

    if let Ok(work) = serde_json::from_slice::<OpenAlexWork>(data) {
        if let Some(index) = &work.abstract_inverted_index {
            let _ = reconstruct_abstract(index);
        }
    }
});
