//! Error types for the search client, the classification pipeline and the trend fitter.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::path::PathBuf;

/// Errors from the HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the remote service (429 response)
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Response body
        message: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response was valid JSON but lacked the expected content
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited { message: message.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// HTTP status carried by this error, if the remote answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::BadRequest { .. } => Some(400),
            Self::Server { status, .. } | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of a single classification attempt.
///
/// Attempt failures are retried and, once retries run out, folded into the
/// batch's output record. They never abort a run.
#[derive(thiserror::Error, Debug)]
pub enum AttemptError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status (429 included).
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// The reply arrived but held no JSON array.
    #[error("parse_error")]
    Parse,
}

impl From<ClientError> for AttemptError {
    fn from(err: ClientError) -> Self {
        match err.status() {
            Some(status) => Self::Http { status, message: err.to_string() },
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Conditions that abort a whole classification run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// No credential for the classification service.
    #[error("missing credential: set {variable}")]
    MissingCredential {
        /// Environment variable that should hold the key
        variable: &'static str,
    },

    /// More batches planned than the daily call cap allows.
    #[error(
        "planned calls {planned} exceed daily_call_cap={cap}; reduce --max or increase the cap deliberately"
    )]
    CapExceeded {
        /// Batches that would be dispatched
        planned: usize,
        /// Configured cap
        cap: usize,
    },

    /// An input line is not a work object.
    #[error("invalid input at line {line}: {source}")]
    InvalidInput {
        /// 1-based line number in the input file
        line: usize,
        /// Decoding failure
        source: serde_json::Error,
    },

    /// Reading input or writing output failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Invalid run settings.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The writer or a worker task stopped unexpectedly.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Wrap an I/O error with the path it concerns.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Returns true for conditions detected before any outbound call.
    #[must_use]
    pub const fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. }
                | Self::CapExceeded { .. }
                | Self::InvalidInput { .. }
                | Self::Config(_)
        )
    }
}

/// Errors from the trend fitter.
#[derive(thiserror::Error, Debug)]
pub enum TrendError {
    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Too little usable data to fit anything.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl TrendError {
    /// Wrap an I/O error with the path it concerns.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Errors from exporting search results.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// The search request failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Writing the export failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A work could not be re-encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HarvestError {
    /// Wrap an I/O error with the path it concerns.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for trend fitting.
pub type TrendResult<T> = Result<T, TrendError>;

/// Result type alias for search exports.
pub type HarvestResult<T> = Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_status() {
        assert_eq!(ClientError::rate_limited("slow down").status(), Some(429));
        assert_eq!(ClientError::server(502, "bad gateway").status(), Some(502));
        assert_eq!(ClientError::bad_request("invalid query").status(), Some(400));
        assert_eq!(ClientError::Malformed("empty".into()).status(), None);
    }

    #[test]
    fn test_attempt_error_keeps_status() {
        let err = AttemptError::from(ClientError::server(503, "down"));
        assert!(matches!(err, AttemptError::Http { status: 503, .. }));

        let err = AttemptError::from(ClientError::Malformed("no choices".into()));
        assert!(matches!(err, AttemptError::Transport(_)));
    }

    #[test]
    fn test_cap_exceeded_message() {
        let err = PipelineError::CapExceeded { planned: 12, cap: 10 };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("daily_call_cap=10"));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let err = PipelineError::MissingCredential { variable: "OPENROUTER_API_KEY" };
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }
}
