//! Configuration for the search client, the classification client and the pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// OpenAlex REST API base URL.
    pub const OPENALEX_API: &str = "https://api.openalex.org";

    /// OpenRouter chat-completions API base URL.
    pub const OPENROUTER_API: &str = "https://openrouter.ai/api/v1";

    /// Referer sent to OpenRouter for attribution.
    pub const OPENROUTER_REFERER: &str = "https://github.com/NZ99/neural_recordings";

    /// Environment variable holding the OpenRouter credential.
    pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

    /// Per-request timeout for classification calls.
    pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(120);

    /// Per-request timeout for search pages.
    pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Fixed sleep after an OpenRouter 429 before the single re-send.
    pub const RATE_LIMIT_GRACE: Duration = Duration::from_secs(5);

    /// Unit of the per-attempt backoff (`unit * (1 + attempt)`).
    pub const BACKOFF_UNIT: Duration = Duration::from_secs(1);

    /// Sleep after an OpenAlex 429 before repeating the same page.
    pub const SEARCH_RATE_LIMIT_SLEEP: Duration = Duration::from_secs(10);

    /// OpenAlex polite-pool request rate (requests per second).
    pub const SEARCH_REQUESTS_PER_SECOND: u32 = 10;

    /// Maximum page size accepted by OpenAlex.
    pub const MAX_PER_PAGE: u32 = 200;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Pipeline defaults exposed on the command line.
pub mod defaults {
    use std::time::Duration;

    /// Default OpenRouter model slug.
    pub const MODEL: &str = "z-ai/glm-4.5-air:free";

    /// Papers per API call.
    pub const BATCH_SIZE: usize = 10;

    /// Parallel API calls.
    pub const CONCURRENCY: usize = 10;

    /// Admissions per sliding window (kept under OpenRouter's 20/min).
    pub const CALLS_PER_MINUTE: usize = 15;

    /// Abort when more batches than this are planned.
    pub const DAILY_CALL_CAP: usize = 1000;

    /// Attempts per batch.
    pub const MAX_RETRIES: u32 = 3;

    /// Sliding window length of the limiter.
    pub const RATE_WINDOW: Duration = Duration::from_secs(60);

    /// Poll interval while the limiter is saturated.
    pub const RATE_POLL: Duration = Duration::from_millis(200);

    /// Bound of the worker → writer channel.
    pub const WRITER_QUEUE: usize = 64;
}

/// OpenAlex identifiers and search defaults.
pub mod openalex {
    /// bioRxiv source id.
    pub const BIORXIV_SOURCE_ID: &str = "https://openalex.org/S4306402567";

    /// Neuroscience concept id (level 1).
    pub const NEUROSCIENCE_CONCEPT_ID: &str = "https://openalex.org/C169760540";

    /// Earliest publication date searched by default.
    pub const START_DATE: &str = "2021-01-01";

    /// Recording-related search terms, kept compact to stay under URL limits.
    pub const RECORDING_TERMS: &[&str] = &[
        "electrophysiolog*",
        "single unit",
        "multiunit",
        "spike train",
        "extracellular recording",
        "intracellular recording",
        "patch clamp",
        "microelectrode array",
        "multi electrode array",
        "Neuropixels",
        "calcium imaging",
        "two photon",
        "three photon",
        "light sheet",
        "miniscope",
        "mesoscope",
        "voltage imaging",
        "GCaMP",
        "GEVI",
    ];
}

/// Settings for the OpenRouter classification client.
#[derive(Clone)]
pub struct ClassifierConfig {
    /// OpenRouter API key.
    pub api_key: String,

    /// API base URL (for testing with mock servers).
    pub base_url: String,

    /// Model slug sent with every request.
    pub model: String,

    /// Attempts per batch.
    pub max_retries: u32,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Sleep after a 429 before the single re-send.
    pub rate_limit_grace: Duration,

    /// Backoff unit between attempts.
    pub backoff_unit: Duration,
}

impl ClassifierConfig {
    /// Create a configuration for the live service.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: api::OPENROUTER_API.to_string(),
            model: model.into(),
            max_retries: defaults::MAX_RETRIES,
            request_timeout: api::CLASSIFY_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            rate_limit_grace: api::RATE_LIMIT_GRACE,
            backoff_unit: api::BACKOFF_UNIT,
        }
    }

    /// Create a test configuration pointed at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            model: defaults::MODEL.to_string(),
            max_retries: defaults::MAX_RETRIES,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_grace: Duration::from_millis(0), // No delay in tests
            backoff_unit: Duration::from_millis(0),
        }
    }

    /// Read the credential from the environment.
    ///
    /// Returns `None` when the variable is unset or blank.
    #[must_use]
    pub fn api_key_from_env() -> Option<String> {
        std::env::var(api::OPENROUTER_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
    }

    /// Delay slept after a failed attempt (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * (1 + attempt)
    }
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Settings for the OpenAlex search client.
#[derive(Debug, Clone)]
pub struct OpenAlexConfig {
    /// API base URL (for testing with mock servers).
    pub base_url: String,

    /// Contact address for OpenAlex's polite pool.
    pub mailto: Option<String>,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Sleep after a 429 before repeating the page.
    pub rate_limit_sleep: Duration,

    /// Requests per second allowed through the gate.
    pub requests_per_second: u32,

    /// Transient-error retries handled by the middleware.
    pub max_transient_retries: u32,
}

impl OpenAlexConfig {
    /// Create a configuration for the live service.
    #[must_use]
    pub fn new(mailto: Option<String>) -> Self {
        Self {
            base_url: api::OPENALEX_API.to_string(),
            mailto,
            request_timeout: api::SEARCH_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            rate_limit_sleep: api::SEARCH_RATE_LIMIT_SLEEP,
            requests_per_second: api::SEARCH_REQUESTS_PER_SECOND,
            max_transient_retries: 3,
        }
    }

    /// Create a test configuration pointed at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            mailto: None,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_sleep: Duration::from_millis(0),
            requests_per_second: 1000,
            max_transient_retries: 0,
        }
    }
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Settings for one classification run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input JSONL of OpenAlex works.
    pub input: PathBuf,

    /// Output JSONL of classification results.
    pub output: PathBuf,

    /// Leading input lines to skip.
    pub start: usize,

    /// Maximum lines kept after `start`.
    pub max: Option<usize>,

    /// Papers per batch.
    pub batch_size: usize,

    /// Concurrent workers.
    pub concurrency: usize,

    /// Abort if more batches than this are planned.
    pub daily_call_cap: usize,

    /// Append to the output and skip fully processed batches.
    pub resume: bool,
}

impl PipelineConfig {
    /// Create a configuration with default sizing.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            start: 0,
            max: None,
            batch_size: defaults::BATCH_SIZE,
            concurrency: defaults::CONCURRENCY,
            daily_call_cap: defaults::DAILY_CALL_CAP,
            resume: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_backoff_grows_with_attempt() {
        let config = ClassifierConfig::new("k", defaults::MODEL);
        assert_eq!(config.backoff(1), Duration::from_secs(2));
        assert_eq!(config.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_classifier_debug_hides_key() {
        let config = ClassifierConfig::new("super-secret-key", defaults::MODEL);
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("model"));
    }

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::new("in.jsonl", "out.jsonl");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.daily_call_cap, 1000);
        assert_eq!(config.start, 0);
        assert!(config.max.is_none());
        assert!(!config.resume);
    }

    #[test]
    fn test_search_terms() {
        assert!(openalex::RECORDING_TERMS.contains(&"Neuropixels"));
        assert!(openalex::RECORDING_TERMS.contains(&"calcium imaging"));
    }
}
