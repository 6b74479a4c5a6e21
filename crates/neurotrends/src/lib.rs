//! neurotrends
//!
//! Literature curation for tracking how many neurons can be recorded at once.
//!
//! # Features
//!
//! - **Search**: cursor-paginated OpenAlex queries exported as JSONL
//! - **Classify**: batched LLM triage of abstracts with a sliding-window rate
//!   limit, per-batch retries, a daily call cap and resumable output
//! - **Trends**: exponential-growth fits, doubling times and milestone
//!   projections over the curated dataset
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use neurotrends::client::{ModelOptionsTable, OpenRouterClient};
//! use neurotrends::config::{ClassifierConfig, PipelineConfig, defaults};
//! use neurotrends::pipeline::{Pipeline, SlidingWindowLimiter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let limiter = Arc::new(SlidingWindowLimiter::per_minute(defaults::CALLS_PER_MINUTE));
//!     let config = ClassifierConfig::new("sk-or-...", defaults::MODEL);
//!     let client = OpenRouterClient::new(config, &ModelOptionsTable::builtin(), limiter)?;
//!
//!     let pipeline = Pipeline::new(PipelineConfig::new("works.jsonl", "results.jsonl"), Arc::new(client));
//!     let summary = pipeline.run().await?;
//!     println!("{summary:?}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod formatters;
pub mod harvest;
pub mod models;
pub mod pipeline;
pub mod trends;

pub use client::{OpenAlexClient, OpenRouterClient};
pub use config::{ClassifierConfig, OpenAlexConfig, PipelineConfig};
pub use error::{ClientError, PipelineError, TrendError};
pub use pipeline::{Classifier, Pipeline, RunSummary};
