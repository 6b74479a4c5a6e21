//! Configuration and model options tests.

use std::time::Duration;

use neurotrends::client::{MatchKind, ModelOptionsTable};
use neurotrends::config::{ClassifierConfig, OpenAlexConfig, PipelineConfig, api, defaults};
use neurotrends::pipeline::require_credential;

#[test]
fn test_classifier_config_defaults() {
    let config = ClassifierConfig::new("key", defaults::MODEL);
    assert_eq!(config.base_url, api::OPENROUTER_API);
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.request_timeout, Duration::from_secs(120));
    assert_eq!(config.rate_limit_grace, Duration::from_secs(5));
    // No sleep grows past the attempt count.
    assert_eq!(config.backoff(2), Duration::from_secs(3));
}

#[test]
fn test_test_configs_do_not_sleep() {
    let classifier = ClassifierConfig::for_testing("http://localhost:1234");
    assert_eq!(classifier.base_url, "http://localhost:1234");
    assert_eq!(classifier.backoff(3), Duration::ZERO);

    let search = OpenAlexConfig::for_testing("http://localhost:1234");
    assert_eq!(search.rate_limit_sleep, Duration::ZERO);
    assert_eq!(search.max_transient_retries, 0);
}

#[test]
fn test_pipeline_config_defaults() {
    let config = PipelineConfig::new("in.jsonl", "out.jsonl");
    assert_eq!(config.start, 0);
    assert_eq!(config.max, None);
    assert_eq!(config.batch_size, 10);
    assert_eq!(config.concurrency, 10);
    assert_eq!(config.daily_call_cap, 1000);
    assert!(!config.resume);
}

#[test]
fn test_missing_credential_names_variable() {
    let err = require_credential(None).unwrap_err();
    assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    assert!(err.is_preflight());
}

#[test]
fn test_model_options_from_file_replaces_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    std::fs::write(
        &path,
        r#"[{"match": "prefix", "pattern": "anthropic/", "options": {"max_tokens": 4096}}]"#,
    )
    .unwrap();

    let table = ModelOptionsTable::from_file(&path).unwrap();
    assert_eq!(table.rows()[0].kind, MatchKind::Prefix);
    assert_eq!(table.resolve("anthropic/some-model")["max_tokens"], 4096);
    // Built-in rows are gone.
    assert!(table.resolve("z-ai/glm-4.5-air:free").is_empty());
}

#[test]
fn test_model_options_from_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ModelOptionsTable::from_file(&dir.path().join("absent.json")).is_err());
}
