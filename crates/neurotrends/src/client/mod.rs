//! HTTP clients for the two remote services.
//!
//! - [`OpenRouterClient`]: chat-completion classification of paper batches,
//!   gated by a sliding-window limiter, with per-batch retries.
//! - [`OpenAlexClient`]: cursor-paginated work search with retry middleware
//!   and a request-rate gate.

mod openalex;
mod openrouter;
mod options;

pub use openalex::{OpenAlexClient, WorkQuery, WorksPage, build_search_query};
pub use openrouter::OpenRouterClient;
pub use options::{MatchKind, ModelOption, ModelOptionsTable};

use crate::error::{ClientError, ClientResult};

/// Map non-success statuses to [`ClientError`].
async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::rate_limited(text))
        }
        400 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::bad_request(text))
        }
        500..=599 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::server(status.as_u16(), text))
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
        }
    }
}
