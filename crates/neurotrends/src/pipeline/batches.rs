//! Input slicing, batch building and resume bookkeeping.

use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Batch, PaperRecord};

/// Apply `--start` then `--max` to the raw input lines.
///
/// A `max` of zero means no limit.
#[must_use]
pub fn slice_lines<T>(lines: &[T], start: usize, max: Option<usize>) -> &[T] {
    let rest = lines.get(start..).unwrap_or(&[]);
    match max {
        Some(max) if max > 0 => &rest[..max.min(rest.len())],
        _ => rest,
    }
}

/// Decode sliced lines into paper records.
///
/// `start` is only used to report the 1-based line number of a bad line.
pub fn parse_records<S: AsRef<str>>(lines: &[S], start: usize) -> PipelineResult<Vec<PaperRecord>> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            PaperRecord::from_json_line(line.as_ref())
                .map_err(|source| PipelineError::InvalidInput { line: start + i + 1, source })
        })
        .collect()
}

/// Split records into consecutive batches of `batch_size`.
///
/// Batch `i` gets `start_index = start + i * batch_size`. The last batch may
/// be shorter. A `batch_size` of zero is treated as one.
#[must_use]
pub fn build_batches(records: Vec<PaperRecord>, batch_size: usize, start: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut items = records.into_iter().peekable();
    let mut offset = 0;

    while items.peek().is_some() {
        let chunk: Vec<PaperRecord> = items.by_ref().take(batch_size).collect();
        let len = chunk.len();
        batches.push(Batch { start_index: start + offset, items: chunk });
        offset += len;
    }
    batches
}

/// Only the field of a historical output line that resume needs.
#[derive(Deserialize)]
struct ResumeLine {
    #[serde(default)]
    input_ids: Vec<serde_json::Value>,
}

/// Ids already covered by an earlier run's output.
#[derive(Debug, Default, Clone)]
pub struct ResumeSet {
    ids: HashSet<String>,
    /// Output lines read successfully.
    pub lines_read: usize,
    /// Output lines that could not be decoded and were skipped.
    pub lines_skipped: usize,
}

impl ResumeSet {
    /// Collect every input id from an existing output log.
    ///
    /// A missing file yields an empty set. Undecodable lines are skipped,
    /// including lines that are not valid UTF-8 after a torn write.
    pub fn scan(path: &Path) -> PipelineResult<Self> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(PipelineError::io(path, e)),
        };

        let mut set = Self::default();
        for (i, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line.map_err(|e| PipelineError::io(path, e))?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<ResumeLine>(&line) {
                Ok(parsed) => {
                    set.lines_read += 1;
                    set.ids.extend(
                        parsed.input_ids.into_iter().filter_map(|id| id.as_str().map(String::from)),
                    );
                }
                Err(e) => {
                    set.lines_skipped += 1;
                    tracing::warn!(line = i + 1, error = %e, "Skipping unreadable output line during resume scan");
                }
            }
        }
        Ok(set)
    }

    /// Build a set directly from ids.
    #[must_use]
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { ids: ids.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    /// Returns true if `id` was seen.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of distinct ids seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if no ids were seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true if every item of `batch` was seen.
    #[must_use]
    pub fn covers(&self, batch: &Batch) -> bool {
        batch.items.iter().all(|item| self.contains(&item.id))
    }

    /// Drop batches whose items were all seen.
    ///
    /// A batch with any unseen item is kept whole, so already classified
    /// siblings in it are classified again.
    #[must_use]
    pub fn pending(&self, batches: Vec<Batch>) -> Vec<Batch> {
        if self.is_empty() {
            return batches;
        }
        batches.into_iter().filter(|batch| !self.covers(batch)).collect()
    }
}
