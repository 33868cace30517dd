use crate::store::StoreError;
use thiserror::Error;

/// Errors produced by the engine, the registry, and the provider adapters.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The stored step list of a pipeline could not be parsed.
    #[error("Invalid pipeline configuration: {0}")]
    Configuration(String),

    /// The caller does not own the pipeline and it is not a shared template.
    #[error("Pipeline {pipeline_id} not found or access denied")]
    Access { pipeline_id: u64 },

    /// A step list was rejected at save time.
    #[error("Invalid pipeline definition: {0}")]
    InvalidPipeline(String),

    /// A caller-supplied argument was out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No provider with this id exists.
    #[error("AI provider {0} not found")]
    ProviderNotFound(u64),

    /// The provider exists but has been deactivated.
    #[error("AI provider {0} is inactive")]
    InactiveProvider(u64),

    /// The provider's name has no registered adapter.
    #[error("Provider {0} is not supported")]
    UnsupportedProvider(String),

    /// The environment variable holding a provider's key is not set.
    #[error("No API key configured for {provider} (set {env_var})")]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },

    /// Non-success HTTP response from a provider.
    #[error("{provider} API returned {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// The provider answered 429.
    #[error("{provider} rate limit exceeded. Please wait a few minutes and try again.")]
    RateLimited {
        provider: &'static str,
        body: String,
    },

    /// The response parsed, but held no generated text where the provider's
    /// schema puts it.
    #[error("{provider} response contained no generated text")]
    Extraction { provider: &'static str },

    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The execution was cancelled via its cancellation token.
    #[error("Pipeline execution was cancelled")]
    Cancelled,

    /// The per-execution deadline elapsed while a provider call was in flight.
    #[error("Pipeline execution deadline exceeded")]
    DeadlineExceeded,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl BridgeError {
    /// Whether this error is the distinguished rate-limit variant.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BridgeError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message_is_friendly() {
        let err = BridgeError::RateLimited {
            provider: "OpenAI",
            body: "{}".into(),
        };
        assert!(err.is_rate_limited());
        assert_eq!(
            err.to_string(),
            "OpenAI rate limit exceeded. Please wait a few minutes and try again."
        );
    }

    #[test]
    fn test_provider_error_carries_status_and_body() {
        let err = BridgeError::Provider {
            provider: "Cohere",
            status: 500,
            body: "boom".into(),
        };
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "Cohere API returned 500: boom");
    }
}
