//! Pipeline driver tests with an in-process classifier.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use neurotrends::config::PipelineConfig;
use neurotrends::error::PipelineError;
use neurotrends::models::{Batch, ClassificationResult};
use neurotrends::pipeline::{Classifier, Pipeline};
use serde_json::json;

/// Counts calls and answers with one verdict per paper.
#[derive(Default)]
struct CountingClassifier {
    calls: AtomicUsize,
    fail_starting_at: Option<usize>,
}

#[async_trait]
impl Classifier for CountingClassifier {
    async fn classify(&self, batch: &Batch) -> ClassificationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Later batches finish first, so output order differs from input order.
        tokio::time::sleep(Duration::from_millis(50u64.saturating_sub(batch.start_index as u64))).await;

        let mut result = ClassificationResult::for_batch(batch);
        if self.fail_starting_at == Some(batch.start_index) {
            result.model_raw = Some("HTTP 500: down".into());
        } else {
            let verdicts = batch.ids().into_iter().map(|id| json!({"id": id, "promising": false})).collect();
            result.model_raw = Some("[]".into());
            result.model_parsed = Some(verdicts);
        }
        result
    }
}

fn write_input(path: &Path, count: usize) {
    let lines: Vec<String> = (0..count)
        .map(|i| {
            json!({
                "id": format!("W{i}"),
                "title": format!("Paper {i}"),
                "abstract_inverted_index": {"neurons": [0]},
                "authorships": [{"author": {"display_name": "Doe"}}],
                "publication_year": 2024
            })
            .to_string()
        })
        .collect();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

fn read_output(path: &Path) -> Vec<ClassificationResult> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_run_writes_one_line_per_batch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("out/results.jsonl");
    write_input(&input, 25);

    let classifier = Arc::new(CountingClassifier::default());
    let summary = Pipeline::new(PipelineConfig::new(&input, &output), classifier.clone()).run().await.unwrap();

    assert_eq!(summary.inputs_written, 25);
    assert_eq!(summary.batches_processed, 3);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);

    let mut results = read_output(&output);
    assert_eq!(results.len(), 3);
    results.sort_by_key(|r| r.batch_start_index);
    let starts: Vec<usize> = results.iter().map(|r| r.batch_start_index).collect();
    assert_eq!(starts, vec![0, 10, 20]);
    assert_eq!(results[2].input_ids, vec!["W20", "W21", "W22", "W23", "W24"]);
}

#[tokio::test]
async fn test_start_and_max_window() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("results.jsonl");
    write_input(&input, 30);

    let mut config = PipelineConfig::new(&input, &output);
    config.start = 5;
    config.max = Some(12);

    let summary = Pipeline::new(config, Arc::new(CountingClassifier::default())).run().await.unwrap();
    assert_eq!(summary.inputs_written, 12);

    let mut results = read_output(&output);
    results.sort_by_key(|r| r.batch_start_index);
    assert_eq!(results[0].batch_start_index, 5);
    assert_eq!(results[0].input_ids.len(), 10);
    assert_eq!(results[0].input_ids[0], "W5");
    assert_eq!(results[1].batch_start_index, 15);
    assert_eq!(results[1].input_ids, vec!["W15", "W16"]);
}

#[tokio::test]
async fn test_cap_exceeded_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("results.jsonl");
    write_input(&input, 25);

    let mut config = PipelineConfig::new(&input, &output);
    config.daily_call_cap = 2;

    let classifier = Arc::new(CountingClassifier::default());
    let err = Pipeline::new(config, classifier.clone()).run().await.unwrap_err();

    assert!(matches!(err, PipelineError::CapExceeded { planned: 3, cap: 2 }));
    assert!(err.is_preflight());
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("results.jsonl");
    write_input(&input, 25);

    let classifier = Arc::new(CountingClassifier { fail_starting_at: Some(10), ..Default::default() });
    let summary = Pipeline::new(PipelineConfig::new(&input, &output), classifier).run().await.unwrap();
    assert_eq!(summary.batches_processed, 3);

    let results = read_output(&output);
    let failed: Vec<_> = results.iter().filter(|r| r.model_parsed.is_none()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].batch_start_index, 10);
    assert_eq!(failed[0].model_raw.as_deref(), Some("HTTP 500: down"));
}

#[tokio::test]
async fn test_resume_skips_covered_batches() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("results.jsonl");
    write_input(&input, 25);

    // Earlier run finished batch 0 and half of batch 10, plus a torn line.
    let earlier = [
        json!({"batch_start_index": 0, "input_ids": ["W0","W1","W2","W3","W4","W5","W6","W7","W8","W9"],
               "model_raw": "[]", "model_parsed": []})
        .to_string(),
        json!({"batch_start_index": 10, "input_ids": ["W10","W11","W12"], "model_raw": null, "model_parsed": null})
            .to_string(),
        "{\"batch_start_index\": 20, \"input_".to_string(),
    ];
    std::fs::write(&output, earlier.join("\n") + "\n").unwrap();

    let mut config = PipelineConfig::new(&input, &output);
    config.resume = true;

    let classifier = Arc::new(CountingClassifier::default());
    let summary = Pipeline::new(config, classifier.clone()).run().await.unwrap();

    assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    assert_eq!(summary.batches_processed, 2);
    assert_eq!(summary.batches_skipped, 1);

    // Appended, not truncated.
    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert!(text.starts_with("{\"batch_start_index\":0"));
}

#[tokio::test]
async fn test_invalid_input_line_aborts_before_calls() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("results.jsonl");
    std::fs::write(&input, "{\"id\":\"W0\"}\nnot json\n").unwrap();

    let classifier = Arc::new(CountingClassifier::default());
    let err = Pipeline::new(PipelineConfig::new(&input, &output), classifier.clone()).run().await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidInput { line: 2, .. }));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_input_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(dir.path().join("absent.jsonl"), dir.path().join("out.jsonl"));

    let err = Pipeline::new(config, Arc::new(CountingClassifier::default())).run().await.unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[tokio::test]
async fn test_zero_max_processes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("results.jsonl");
    write_input(&input, 5);

    let mut config = PipelineConfig::new(&input, &output);
    config.max = Some(0);
    config.batch_size = 2;

    let summary = Pipeline::new(config, Arc::new(CountingClassifier::default())).run().await.unwrap();
    assert_eq!(summary.batches_processed, 3);
    assert_eq!(summary.inputs_written, 5);
}

#[tokio::test]
async fn test_start_past_end_writes_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    let output = dir.path().join("results.jsonl");
    write_input(&input, 5);

    let mut config = PipelineConfig::new(&input, &output);
    config.start = 10;

    let summary = Pipeline::new(config, Arc::new(CountingClassifier::default())).run().await.unwrap();
    assert_eq!(summary.batches_processed, 0);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_writer_failure_stops_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("works.jsonl");
    write_input(&input, 40);

    // Every write to /dev/full fails with ENOSPC.
    let mut config = PipelineConfig::new(&input, "/dev/full");
    config.batch_size = 1;
    config.concurrency = 1;

    let classifier = Arc::new(CountingClassifier::default());
    let err = Pipeline::new(config, classifier.clone()).run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Io { .. }), "got {err:?}");
    let calls = classifier.calls.load(Ordering::SeqCst);
    assert!(calls <= 2, "dispatch kept going after the writer failed: {calls} calls");
}
