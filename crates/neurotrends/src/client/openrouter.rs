//! OpenRouter chat-completion client used to classify paper batches.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ModelOptionsTable, handle_response};
use crate::config::{ClassifierConfig, api};
use crate::error::{AttemptError, ClientError, ClientResult};
use crate::formatters::{json::parse_model_json, prompt};
use crate::models::{Batch, ClassificationResult};
use crate::pipeline::{Classifier, Clock, SlidingWindowLimiter, SystemClock};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter client.
///
/// Every attempt waits on the shared limiter; a 429 gets one grace re-send;
/// failed attempts back off `unit * (1 + attempt)` before the next one.
pub struct OpenRouterClient<C = SystemClock> {
    /// HTTP client with auth headers.
    client: Client,

    /// Retry, timeout and endpoint settings.
    config: ClassifierConfig,

    /// Model-specific payload fields, resolved once.
    extra: Map<String, Value>,

    /// Admission gate shared by all workers.
    limiter: Arc<SlidingWindowLimiter<C>>,
}

impl<C: Clock> OpenRouterClient<C> {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the credential is not a valid header or HTTP client
    /// initialization fails.
    pub fn new(
        config: ClassifierConfig,
        options: &ModelOptionsTable,
        limiter: Arc<SlidingWindowLimiter<C>>,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("HTTP-Referer", HeaderValue::from_static(api::OPENROUTER_REFERER));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let extra = options.resolve(&config.model);
        if !extra.is_empty() {
            tracing::info!(model = %config.model, options = ?extra.keys().collect::<Vec<_>>(), "Applying model options");
        }

        Ok(Self { client, config, extra, limiter })
    }

    /// Model slug sent with requests.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Request body for one user prompt.
    #[must_use]
    pub fn payload(&self, user_prompt: &str) -> Value {
        let mut payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": prompt::SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "text"},
        });
        if let Some(body) = payload.as_object_mut() {
            for (key, value) in &self.extra {
                body.insert(key.clone(), value.clone());
            }
        }
        payload
    }

    /// Send one completion request and return the reply text.
    ///
    /// A 429 is answered by sleeping the grace delay and sending once more;
    /// the second response is handled like any other.
    pub async fn complete(&self, user_prompt: &str) -> ClientResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = self.payload(user_prompt);

        let mut response = self.client.post(&url).json(&payload).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(grace = ?self.config.rate_limit_grace, "Rate limited by OpenRouter, re-sending once");
            tokio::time::sleep(self.config.rate_limit_grace).await;
            response = self.client.post(&url).json(&payload).send().await?;
        }

        let response = handle_response(response).await?;
        let body: ChatResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(ClientError::Malformed(format!("service error: {error}")));
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClientError::Malformed("reply has no message content".to_string()))
    }
}

#[async_trait]
impl<C: Clock + 'static> Classifier for OpenRouterClient<C> {
    async fn classify(&self, batch: &Batch) -> ClassificationResult {
        let user_prompt = prompt::user_prompt(batch);
        let mut result = ClassificationResult::for_batch(batch);
        let max_retries = self.config.max_retries;

        for attempt in 1..=max_retries {
            self.limiter.acquire().await;

            let failure = match self.complete(&user_prompt).await {
                Ok(text) => {
                    let parsed = parse_model_json(&text);
                    result.model_raw = Some(text);
                    if parsed.is_some() {
                        result.model_parsed = parsed;
                        tracing::debug!(batch_start_index = batch.start_index, attempt, "Batch classified");
                        return result;
                    }
                    AttemptError::Parse
                }
                Err(e) => {
                    let failure = AttemptError::from(e);
                    result.model_raw = Some(failure.to_string());
                    failure
                }
            };

            tracing::warn!(
                batch_start_index = batch.start_index,
                attempt,
                max_retries,
                error = %failure,
                "Classification attempt failed"
            );

            if attempt < max_retries {
                tokio::time::sleep(self.config.backoff(attempt)).await;
            }
        }

        result
    }
}

impl<C> std::fmt::Debug for OpenRouterClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("model", &self.config.model)
            .field("extra", &self.extra)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(model: &str) -> OpenRouterClient {
        let mut config = ClassifierConfig::for_testing("http://127.0.0.1:9");
        config.model = model.to_string();
        OpenRouterClient::new(
            config,
            &ModelOptionsTable::builtin(),
            Arc::new(SlidingWindowLimiter::per_minute(100)),
        )
        .unwrap()
    }

    #[test]
    fn test_payload_shape() {
        let payload = client("openai/gpt-4o").payload("hello");
        assert_eq!(payload["model"], "openai/gpt-4o");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "hello");
        assert_eq!(payload["response_format"]["type"], "text");
        assert!(payload.get("reasoning").is_none());
    }

    #[test]
    fn test_payload_includes_model_options() {
        let payload = client("x-ai/grok-4.1-fast:free").payload("hi");
        assert_eq!(payload["reasoning"]["effort"], "medium");
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", client("m"));
        assert!(!debug.contains("test-key"));
    }
}
