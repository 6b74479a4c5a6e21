//! Data models for OpenAlex works, classification batches and the curated dataset.
//!
//! Models use `#[serde(default)]` for optional fields and keep the source
//! field names (OpenAlex snake_case, CSV column headers).

mod batch;
mod dataset;
mod work;

pub use batch::{Batch, ClassificationResult};
pub use dataset::{DEFAULT_MONTH, RecordingPaper, decimal_year, format_date};
pub use work::{
    Authorship, DehydratedAuthor, MAX_ABSTRACT_POSITION, OpenAlexWork, PaperRecord, Year,
    reconstruct_abstract,
};
