//! OpenAlex works search.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    RetryTransientMiddleware, Retryable, RetryableStrategy, default_on_request_failure, policies::ExponentialBackoff,
};
use serde::Deserialize;
use serde_json::Value;

use super::handle_response;
use crate::config::{OpenAlexConfig, api, openalex};
use crate::error::ClientResult;

/// Retry decision for a response status.
///
/// 429 is passed through untouched: [`OpenAlexClient::fetch_page`] sleeps the
/// configured delay and repeats the page itself.
fn retryable_status(status: StatusCode) -> Option<Retryable> {
    if status.is_success() || status == StatusCode::TOO_MANY_REQUESTS {
        None
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        Some(Retryable::Transient)
    } else {
        Some(Retryable::Fatal)
    }
}

/// Transient-failure strategy that leaves rate limiting to the page loop.
struct TransientExceptRateLimit;

impl RetryableStrategy for TransientExceptRateLimit {
    fn handle(&self, res: &Result<reqwest::Response, reqwest_middleware::Error>) -> Option<Retryable> {
        match res {
            Ok(response) => retryable_status(response.status()),
            Err(error) => default_on_request_failure(error),
        }
    }
}

/// Quote multi-word terms for OpenAlex search.
fn quote(term: &str) -> String {
    if term.contains(' ') { format!("\"{term}\"") } else { term.to_string() }
}

/// OR-join terms for OpenAlex's `search` parameter.
#[must_use]
pub fn build_search_query<S: AsRef<str>>(terms: &[S]) -> String {
    terms.iter().map(|t| quote(t.as_ref())).collect::<Vec<_>>().join(" OR ")
}

/// A works search: query text, filters and paging limits.
#[derive(Debug, Clone)]
pub struct WorkQuery {
    /// Search string (see [`build_search_query`]).
    pub search: String,

    /// Inclusive publication date lower bound (YYYY-MM-DD).
    pub start_date: String,

    /// Restrict to one source (e.g. bioRxiv).
    pub source_id: Option<String>,

    /// Restrict to one concept (e.g. Neuroscience).
    pub concept_id: Option<String>,

    /// Page size, capped at 200.
    pub per_page: u32,

    /// Stop after this many works.
    pub max_results: Option<usize>,
}

impl WorkQuery {
    /// Query over the default recording terms and bioRxiv/Neuroscience filters.
    #[must_use]
    pub fn recording_defaults() -> Self {
        Self {
            search: build_search_query(openalex::RECORDING_TERMS),
            start_date: openalex::START_DATE.to_string(),
            source_id: Some(openalex::BIORXIV_SOURCE_ID.to_string()),
            concept_id: Some(openalex::NEUROSCIENCE_CONCEPT_ID.to_string()),
            per_page: api::MAX_PER_PAGE,
            max_results: None,
        }
    }

    /// Comma-joined `filter` parameter.
    #[must_use]
    pub fn filter(&self) -> String {
        let mut filters = vec![format!("from_publication_date:{}", self.start_date)];
        if let Some(source) = &self.source_id {
            filters.push(format!("primary_location.source.id:{source}"));
        }
        if let Some(concept) = &self.concept_id {
            filters.push(format!("concept.id:{concept}"));
        }
        filters.join(",")
    }
}

/// One page of `/works` results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorksPage {
    /// Works on this page, as returned.
    #[serde(default)]
    pub results: Vec<Value>,

    /// Paging metadata.
    #[serde(default)]
    pub meta: WorksMeta,
}

/// Paging metadata of a works page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorksMeta {
    /// Total matches reported by OpenAlex.
    #[serde(default)]
    pub count: Option<u64>,

    /// Cursor of the next page; absent on the last page.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// OpenAlex API client.
#[derive(Clone)]
pub struct OpenAlexClient {
    /// HTTP client with retry middleware.
    client: ClientWithMiddleware,

    /// Request-rate gate.
    gate: Arc<DefaultDirectRateLimiter>,

    /// Endpoint and pacing settings.
    config: OpenAlexConfig,
}

impl OpenAlexClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: OpenAlexConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(config.max_transient_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(retry_policy, TransientExceptRateLimit))
            .build();

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let gate = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self { client, gate, config })
    }

    /// Fetch one page at `cursor`.
    ///
    /// A 429 sleeps the configured delay and repeats the same page.
    pub async fn fetch_page(&self, query: &WorkQuery, cursor: &str) -> ClientResult<WorksPage> {
        let url = format!("{}/works", self.config.base_url);

        let mut params = vec![
            ("search".to_string(), query.search.clone()),
            ("filter".to_string(), query.filter()),
            ("per-page".to_string(), query.per_page.clamp(1, api::MAX_PER_PAGE).to_string()),
            ("cursor".to_string(), cursor.to_string()),
            ("sort".to_string(), "publication_date:desc".to_string()),
        ];
        if let Some(mailto) = &self.config.mailto {
            params.push(("mailto".to_string(), mailto.clone()));
        }

        loop {
            self.gate.until_ready().await;

            let response = self.client.get(&url).query(&params).send().await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(sleep = ?self.config.rate_limit_sleep, "Rate limited by OpenAlex, retrying page");
                tokio::time::sleep(self.config.rate_limit_sleep).await;
                continue;
            }

            let response = handle_response(response).await?;
            return Ok(response.json().await?);
        }
    }

    /// Stream every matching work, following cursors.
    ///
    /// Ends after `max_results` works or when OpenAlex stops returning a cursor.
    pub fn search_works<'a>(
        &'a self,
        query: &'a WorkQuery,
    ) -> impl Stream<Item = ClientResult<Value>> + 'a {
        async_stream::try_stream! {
            let mut cursor = Some("*".to_string());
            let mut fetched = 0usize;

            'pages: while let Some(current) = cursor.take() {
                let page = self.fetch_page(query, &current).await?;
                tracing::debug!(results = page.results.len(), total = ?page.meta.count, "Fetched OpenAlex page");

                for work in page.results {
                    yield work;
                    fetched += 1;
                    if query.max_results.is_some_and(|max| fetched >= max) {
                        break 'pages;
                    }
                }

                cursor = page.meta.next_cursor.filter(|c| !c.is_empty());
            }
        }
    }
}

impl std::fmt::Debug for OpenAlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAlexClient").field("base_url", &self.config.base_url).finish()
    }
}
