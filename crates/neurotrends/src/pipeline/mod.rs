//! Batch classification pipeline.
//!
//! A run moves through these stages:
//!
//! 1. **Loading**: read the input, apply `start` and `max`
//! 2. **Resume scan**: collect ids already present in the output (resume only)
//! 3. **Building batches**: fixed-size groups in input order, fully covered ones dropped
//! 4. **Cap check**: abort before any call if too many batches are planned
//! 5. **Dispatching**: bounded workers classify batches, each attempt gated by the limiter
//! 6. **Draining**: one writer appends each result as it completes
//!
//! Per-batch failures end up in the output record; only pre-flight checks
//! and I/O failures abort a run.

mod batches;
mod rate_limit;
mod writer;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub use batches::{ResumeSet, build_batches, parse_records, slice_lines};
pub use rate_limit::{Clock, ManualClock, SlidingWindowLimiter, SystemClock};
pub use writer::{ResultWriter, WriteStats, open_output};

use crate::config::{PipelineConfig, api, defaults};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Batch, ClassificationResult};

/// Turns one batch into its output record.
///
/// Implementations absorb their own failures: the returned record always
/// carries the batch's ids, with `model_parsed` left empty on failure.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify every paper in `batch`.
    async fn classify(&self, batch: &Batch) -> ClassificationResult;
}

/// Stages of a run, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading and slicing input.
    Loading,
    /// Collecting ids from an earlier output.
    ResumeScan,
    /// Partitioning records into batches.
    BuildingBatches,
    /// Comparing planned calls with the cap.
    CapCheck,
    /// Handing batches to workers.
    Dispatching,
    /// Waiting for workers and the writer.
    Draining,
    /// Run finished.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loading => "loading",
            Self::ResumeScan => "resume_scan",
            Self::BuildingBatches => "building_batches",
            Self::CapCheck => "cap_check",
            Self::Dispatching => "dispatching",
            Self::Draining => "draining",
            Self::Done => "done",
        })
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Input papers across written records.
    pub inputs_written: usize,
    /// Records written (one per dispatched batch).
    pub batches_processed: usize,
    /// Batches skipped because resume found them complete.
    pub batches_skipped: usize,
}

/// Return the credential or fail the run before any work starts.
pub fn require_credential(api_key: Option<String>) -> PipelineResult<String> {
    api_key.filter(|k| !k.trim().is_empty()).ok_or(PipelineError::MissingCredential {
        variable: api::OPENROUTER_KEY_ENV,
    })
}

/// Runs batches through a [`Classifier`] and records the results.
pub struct Pipeline {
    config: PipelineConfig,
    classifier: Arc<dyn Classifier>,
}

impl Pipeline {
    /// Create a pipeline for one run.
    #[must_use]
    pub fn new(config: PipelineConfig, classifier: Arc<dyn Classifier>) -> Self {
        Self { config, classifier }
    }

    /// Plan the batches this run would dispatch, without calling anything.
    pub async fn plan(&self) -> PipelineResult<(Vec<Batch>, usize)> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            return Err(PipelineError::Config("batch size must be at least 1".into()));
        }

        tracing::info!(stage = %Stage::Loading, input = %cfg.input.display(), "Reading input");
        let content = tokio::fs::read_to_string(&cfg.input)
            .await
            .map_err(|e| PipelineError::io(&cfg.input, e))?;
        let lines: Vec<&str> = content.lines().collect();
        let sliced = slice_lines(&lines, cfg.start, cfg.max);
        let records = parse_records(sliced, cfg.start)?;

        let seen = if cfg.resume {
            tracing::info!(stage = %Stage::ResumeScan, output = %cfg.output.display(), "Scanning earlier output");
            let seen = ResumeSet::scan(&cfg.output)?;
            tracing::info!(
                ids = seen.len(),
                lines = seen.lines_read,
                skipped_lines = seen.lines_skipped,
                "Resume scan complete"
            );
            seen
        } else {
            ResumeSet::default()
        };

        let all = build_batches(records, cfg.batch_size, cfg.start);
        let total = all.len();
        let pending = seen.pending(all);
        let skipped = total - pending.len();
        tracing::info!(
            stage = %Stage::BuildingBatches,
            records = sliced.len(),
            batches = pending.len(),
            skipped,
            "Batches built"
        );

        Ok((pending, skipped))
    }

    /// Execute the run.
    pub async fn run(&self) -> PipelineResult<RunSummary> {
        let cfg = &self.config;
        let (batches, skipped) = self.plan().await?;

        tracing::debug!(stage = %Stage::CapCheck, planned = batches.len(), cap = cfg.daily_call_cap);
        if batches.len() > cfg.daily_call_cap {
            return Err(PipelineError::CapExceeded { planned: batches.len(), cap: cfg.daily_call_cap });
        }

        let file = open_output(&cfg.output, cfg.resume).await?;
        let writer = ResultWriter::spawn(file, cfg.output.clone(), defaults::WRITER_QUEUE);

        let width = cfg.concurrency.max(1);
        let permits = Arc::new(Semaphore::new(width));
        let mut workers = JoinSet::new();
        let planned = batches.len();
        tracing::info!(stage = %Stage::Dispatching, batches = planned, concurrency = width, "Dispatching batches");

        let mut halted = false;
        for batch in batches {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Internal(format!("worker pool closed: {e}")))?;
            // The writer only closes early when it failed; further calls would be wasted.
            if writer.is_closed() {
                tracing::warn!(batch_start_index = batch.start_index, "Writer stopped, halting dispatch");
                halted = true;
                break;
            }
            let classifier = Arc::clone(&self.classifier);
            let results = writer.sender();

            workers.spawn(async move {
                let _permit = permit;
                if results.is_closed() {
                    return false;
                }
                let result = classifier.classify(&batch).await;
                if !result.is_success() {
                    tracing::warn!(batch_start_index = result.batch_start_index, "Batch failed after retries");
                }
                results.send(result).await.is_ok()
            });
        }

        if halted {
            workers.abort_all();
        }

        tracing::info!(stage = %Stage::Draining, "Waiting for workers");
        let mut undelivered = 0usize;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => undelivered += 1,
                Err(e) if e.is_cancelled() => undelivered += 1,
                Err(e) => return Err(PipelineError::Internal(format!("worker task failed: {e}"))),
            }
        }

        // A closed channel means the writer failed; its own error is the useful one.
        let stats = writer.finish().await?;
        if halted || undelivered > 0 {
            return Err(PipelineError::Internal(format!(
                "{undelivered} results were not written"
            )));
        }
        tracing::info!(
            stage = %Stage::Done,
            inputs = stats.inputs,
            batches = stats.batches,
            failed = stats.failed,
            "Run complete"
        );

        Ok(RunSummary {
            inputs_written: stats.inputs,
            batches_processed: stats.batches,
            batches_skipped: skipped,
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("config", &self.config).finish()
    }
}
