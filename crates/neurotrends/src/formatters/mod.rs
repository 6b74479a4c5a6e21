//! Output formatters: model prompts, reply parsing and the trend report.

pub mod json;
pub mod markdown;
pub mod prompt;

pub use self::json::parse_model_json;
pub use markdown::{format_doubling, format_trend_report, format_year};
