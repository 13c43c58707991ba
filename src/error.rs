//! Error taxonomy for collection runs.

use thiserror::Error;

use crate::engine::tools::{preview, redact_headers, redact_params};

/// Result alias used throughout the collection engine.
pub type CollectResult<T> = std::result::Result<T, CollectError>;

#[derive(Debug, Error)]
pub enum CollectError {
    /// Bad run configuration (empty or unknown query dimensions, bad output format, ...).
    /// Raised before any network call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Non-2xx, non-429 response. Fatal for the run.
    #[error(
        "query to {url} with params {} and headers {} failed with status code {status}: {}",
        redact_params(.params),
        redact_headers(.headers),
        preview(.body)
    )]
    Http {
        url: String,
        params: Vec<(String, String)>,
        headers: Vec<(String, String)>,
        status: u16,
        body: String,
    },

    /// 2xx response whose body is not JSON.
    #[error(
        "query to {url} with params {} and headers {} returned undecodable body (status {status}): {source}",
        redact_params(.params),
        redact_headers(.headers)
    )]
    Decode {
        url: String,
        params: Vec<(String, String)>,
        headers: Vec<(String, String)>,
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// Connection, TLS, or timeout failure before any status was received.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Rate limiting did not clear within the injected retry cap.
    #[error("rate limit on {url} still active after {retries} retries")]
    RateLimitExhausted { url: String, retries: u32 },

    /// Adapter lacks (or cannot serve) the metadata capability. Recovered by the controller.
    #[error("capability unavailable: {0}")]
    Capability(String),

    /// Structural mismatch between merge inputs (missing key column, incompatible key types).
    #[error("cannot merge: {0}")]
    Merge(String),

    #[error("credentials: {0}")]
    Credentials(String),

    #[error("failed to persist {target}: {source}")]
    Sink {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Cooperative stop observed before a request. Not a failure; the controller maps it to
    /// the terminated state.
    #[error("run cancelled")]
    Cancelled,
}

impl CollectError {
    /// Configuration mistakes, as opposed to runtime failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CollectError::Validation(_) | CollectError::Merge(_) | CollectError::Credentials(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CollectError::Cancelled)
    }
}
