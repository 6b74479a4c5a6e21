//! Export of OpenAlex search results to JSONL.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::client::{OpenAlexClient, WorkQuery};
use crate::error::{HarvestError, HarvestResult};

/// Directory default exports are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Totals of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    /// File written.
    pub path: PathBuf,
    /// Distinct works written.
    pub written: usize,
    /// Works dropped because their id was already written.
    pub duplicates: usize,
    /// Size of the file in bytes.
    pub bytes: u64,
}

/// `data/openalex_biorxiv_neuro_<YYYY-MM-DD>.jsonl` for today's date.
#[must_use]
pub fn default_output_path() -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    Path::new(DEFAULT_OUTPUT_DIR).join(format!("openalex_biorxiv_neuro_{today}.jsonl"))
}

/// Stream every work matching `query` into `path`, one JSON object per line.
///
/// Works are de-duplicated by `id`; works without an id are kept.
pub async fn harvest(client: &OpenAlexClient, query: &WorkQuery, path: &Path) -> HarvestResult<HarvestSummary> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| HarvestError::io(parent, e))?;
    }
    let file = tokio::fs::File::create(path).await.map_err(|e| HarvestError::io(path, e))?;
    let mut out = BufWriter::new(file);

    let mut seen = HashSet::new();
    let mut written = 0usize;
    let mut duplicates = 0usize;

    let works = client.search_works(query);
    futures::pin_mut!(works);

    while let Some(work) = works.next().await {
        let work = work?;
        if let Some(id) = work.get("id").and_then(|v| v.as_str()) {
            if !seen.insert(id.to_string()) {
                duplicates += 1;
                continue;
            }
        }

        let mut line = serde_json::to_vec(&work)?;
        line.push(b'\n');
        out.write_all(&line).await.map_err(|e| HarvestError::io(path, e))?;
        written += 1;

        if written % 1000 == 0 {
            tracing::info!(written, "Export progress");
        }
    }

    out.flush().await.map_err(|e| HarvestError::io(path, e))?;
    let bytes = tokio::fs::metadata(path).await.map_err(|e| HarvestError::io(path, e))?.len();

    tracing::info!(written, duplicates, bytes, path = %path.display(), "Export complete");
    Ok(HarvestSummary { path: path.to_path_buf(), written, duplicates, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path_is_dated() {
        let path = default_output_path();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with(DEFAULT_OUTPUT_DIR));
        assert!(name.starts_with("openalex_biorxiv_neuro_"));
        assert!(name.ends_with(".jsonl"));
        // openalex_biorxiv_neuro_ + YYYY-MM-DD + .jsonl
        assert_eq!(name.len(), 23 + 10 + 6);
    }
}
