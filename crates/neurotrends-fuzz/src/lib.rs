//! Fuzzing library for neurotrends.
//!
//! Targets cover decoding of input works, extraction of the verdict array
//! from model replies, and decoding of output records and options tables.
//!
//! # Usage
//!
//! ```bash
//! cd crates/neurotrends-fuzz
//! cargo +nightly fuzz run fuzz_work_parse -- -max_total_time=60
//! ```

pub use neurotrends::formatters::parse_model_json;
pub use neurotrends::models;
