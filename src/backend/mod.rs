//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over text-generation providers, turning a
//! normalized [`LlmRequest`] into one provider-specific HTTP call and the
//! provider's reply back into an [`LlmResponse`].
//!
//! ## Architecture
//!
//! ```text
//! ProviderRegistry ──► LlmRequest ──► Backend::complete() ──► LlmResponse
//!                                            │
//!        ┌──────────────┬───────────────┬────┴─────────┬──────────────┐
//!   OpenAiBackend  AnthropicBackend  GeminiBackend  CohereBackend  HuggingFaceBackend
//!  /chat/completions   /messages    :generateContent    /chat       /models/gpt2
//! ```
//!
//! Headers are attached per request. The shared `reqwest::Client` never
//! carries provider-specific defaults, so concurrent executions against
//! different providers cannot see each other's credentials.

pub mod anthropic;
pub mod cohere;
pub mod gemini;
pub mod huggingface;
pub mod mock;
pub mod openai;
pub mod response;

pub use anthropic::AnthropicBackend;
pub use cohere::CohereBackend;
pub use gemini::GeminiBackend;
pub use huggingface::HuggingFaceBackend;
pub use mock::{MockBackend, MockReply};
pub use openai::OpenAiBackend;
pub use response::{ProviderResponse, ResponseShape};

use crate::error::Result;
use crate::BridgeError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

/// A normalized provider request.
///
/// The registry builds this from the rendered prompt and the credential the
/// backend asks for via [`Backend::credential_var`].
#[derive(Clone)]
pub struct LlmRequest {
    /// The rendered prompt text, sent as a single user turn.
    pub prompt: String,

    /// API key for the provider, if it needs one.
    pub api_key: Option<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// The API key, or [`BridgeError::MissingCredential`] if none was supplied.
    pub(crate) fn require_key(
        &self,
        provider: &'static str,
        env_var: &'static str,
    ) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(BridgeError::MissingCredential { provider, env_var })
    }
}

impl std::fmt::Debug for LlmRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmRequest")
            .field("prompt", &self.prompt)
            .field("api_key", &self.api_key.as_ref().map(|k| redact(k)))
            .finish()
    }
}

/// Keep a short prefix of a secret for identification.
pub(crate) fn redact(key: &str) -> String {
    match key.get(..6) {
        Some(prefix) if key.len() > 6 => format!("{}***", prefix),
        _ => "***".to_string(),
    }
}

/// A normalized provider response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text. Never empty: empty extractions are errors.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, model info), as raw JSON.
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over text-generation providers.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one completion call against the provider rooted at `base_url`.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable name for logging, audit and error messages.
    fn name(&self) -> &'static str;

    /// Environment variable holding this provider's API key, if it needs one.
    fn credential_var(&self) -> Option<&'static str> {
        None
    }
}

/// Send a prepared request and return the status and body of a successful
/// response.
///
/// 429 maps to [`BridgeError::RateLimited`]; any other non-success status to
/// [`BridgeError::Provider`] carrying the raw body.
pub(crate) async fn send(provider: &'static str, req: RequestBuilder) -> Result<(u16, String)> {
    let resp = req.send().await.map_err(|e| {
        tracing::error!(provider, error = %e, "provider request failed");
        BridgeError::Request(e)
    })?;

    let status = resp.status();
    let body = resp.text().await?;

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        tracing::error!(provider, "provider rate limit exceeded");
        return Err(BridgeError::RateLimited { provider, body });
    }
    if !status.is_success() {
        tracing::error!(provider, status = status.as_u16(), body = %body, "provider returned error");
        return Err(BridgeError::Provider {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    Ok((status.as_u16(), body))
}

/// Parse a successful body into `shape` and pull the generated text out.
pub(crate) fn finish(
    provider: &'static str,
    shape: ResponseShape,
    status: u16,
    body: &str,
) -> Result<LlmResponse> {
    let parsed = ProviderResponse::parse(shape, body)?;
    let metadata = parsed.metadata();
    let text = parsed.into_text(provider)?;
    Ok(LlmResponse {
        text,
        status,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_debug_redacts_key() {
        let request = LlmRequest::new("hello").with_api_key("sk-1234567890abcdef");
        let debug = format!("{:?}", request);
        assert!(!debug.contains("1234567890abcdef"));
        assert!(debug.contains("sk-123***"));
    }

    #[test]
    fn test_redact_short_key() {
        assert_eq!(redact("abc"), "***");
    }

    #[test]
    fn test_require_key_missing() {
        let err = LlmRequest::new("p")
            .require_key("Cohere", "COHERE_API_KEY")
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::MissingCredential {
                env_var: "COHERE_API_KEY",
                ..
            }
        ));
    }

    #[test]
    fn test_finish_empty_text_is_extraction_error() {
        let err = finish(
            "Cohere",
            ResponseShape::Cohere,
            200,
            r#"{"text": ""}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Extraction { provider: "Cohere" }));
    }

    #[test]
    fn test_finish_non_json_is_json_error() {
        let err = finish("Cohere", ResponseShape::Cohere, 200, "<html>").unwrap_err();
        assert!(matches!(err, BridgeError::Json(_)));
    }
}
