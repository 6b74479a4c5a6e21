//! Single writer for the classification log.
//!
//! Workers send finished records over a bounded channel; one task owns the
//! file and appends each record as a JSON line, flushing after every line.
//! Line order is therefore completion order.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{PipelineError, PipelineResult};
use crate::models::ClassificationResult;

/// Totals reported by the writer when its channel closes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    /// Records written.
    pub batches: usize,
    /// Input ids across written records.
    pub inputs: usize,
    /// Written records whose reply could not be parsed.
    pub failed: usize,
}

/// Open the output log: append when resuming, truncate otherwise.
pub async fn open_output(path: &Path, append: bool) -> PipelineResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| PipelineError::io(parent, e))?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(path).await.map_err(|e| PipelineError::io(path, e))
}

/// Handle to the writer task.
#[derive(Debug)]
pub struct ResultWriter {
    sender: mpsc::Sender<ClassificationResult>,
    task: JoinHandle<PipelineResult<WriteStats>>,
}

impl ResultWriter {
    /// Spawn the writer task on `file` with a channel of `capacity` records.
    #[must_use]
    pub fn spawn(file: File, path: PathBuf, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(drain(file, path, receiver));
        Self { sender, task }
    }

    /// A sender for one worker.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<ClassificationResult> {
        self.sender.clone()
    }

    /// Returns true once the writer task has stopped accepting records.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Close the channel and wait for every queued record to be written.
    pub async fn finish(self) -> PipelineResult<WriteStats> {
        drop(self.sender);
        self.task.await.map_err(|e| PipelineError::Internal(format!("writer task failed: {e}")))?
    }
}

async fn drain(
    mut file: File,
    path: PathBuf,
    mut receiver: mpsc::Receiver<ClassificationResult>,
) -> PipelineResult<WriteStats> {
    let mut stats = WriteStats::default();

    while let Some(result) = receiver.recv().await {
        let mut line = serde_json::to_string(&result)
            .map_err(|e| PipelineError::Internal(format!("cannot encode result: {e}")))?;
        line.push('\n');

        file.write_all(line.as_bytes()).await.map_err(|e| PipelineError::io(&path, e))?;
        file.flush().await.map_err(|e| PipelineError::io(&path, e))?;

        stats.batches += 1;
        stats.inputs += result.input_ids.len();
        if !result.is_success() {
            stats.failed += 1;
        }
        tracing::debug!(
            batch_start_index = result.batch_start_index,
            written = stats.batches,
            "Wrote classification record"
        );
    }

    file.sync_all().await.map_err(|e| PipelineError::io(&path, e))?;
    Ok(stats)
}
