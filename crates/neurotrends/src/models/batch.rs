//! Batches of papers and the per-batch classification record.

use serde::{Deserialize, Serialize};

use super::PaperRecord;

/// A fixed group of papers sent in one classification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Input line index (after `--start`, counted from the file start) of the first item.
    pub start_index: usize,
    /// Papers in input order.
    pub items: Vec<PaperRecord>,
}

impl Batch {
    /// Ids of the batch items, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Number of papers in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch holds no papers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One output line: the outcome of classifying a batch.
///
/// `model_parsed` is `None` when every attempt failed; `model_raw` then holds
/// the last reply or error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// `start_index` of the producing batch.
    pub batch_start_index: usize,

    /// Ids of the producing batch, in order.
    pub input_ids: Vec<String>,

    /// Raw model reply, or the last error text on failure.
    pub model_raw: Option<String>,

    /// Parsed per-paper verdicts.
    pub model_parsed: Option<Vec<serde_json::Value>>,
}

impl ClassificationResult {
    /// Start a record for `batch` with no model output yet.
    #[must_use]
    pub fn for_batch(batch: &Batch) -> Self {
        Self {
            batch_start_index: batch.start_index,
            input_ids: batch.ids(),
            model_raw: None,
            model_parsed: None,
        }
    }

    /// Returns true if the model reply was parsed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.model_parsed.is_some()
    }
}
