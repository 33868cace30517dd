//! Backend for OpenAI-compatible chat-completions APIs.
//!
//! [`OpenAiBackend`] covers four providers that share the request and
//! response schema and differ only in model, credential, extra headers and
//! (for Vercel) a fixed endpoint: OpenAI, Grok, OpenRouter and Vercel.
//!
//! Endpoint: `{base}/chat/completions`.

use super::{finish, send, Backend, LlmRequest, LlmResponse, ResponseShape};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f64 = 0.7;

/// Backend for an OpenAI-compatible chat-completions API.
///
/// # Example
///
/// ```
/// use prompt_bridge::backend::{Backend, OpenAiBackend};
///
/// let backend = OpenAiBackend::openrouter();
/// assert_eq!(backend.name(), "OpenRouter");
/// assert_eq!(backend.credential_var(), Some("OPENROUTER_API_KEY"));
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    label: &'static str,
    model: &'static str,
    credential_var: &'static str,
    /// Full URL used instead of `{base}/chat/completions`.
    endpoint: Option<String>,
    extra_headers: Vec<(&'static str, &'static str)>,
}

impl OpenAiBackend {
    /// OpenAI itself (`gpt-3.5-turbo-0125`).
    pub fn openai() -> Self {
        Self {
            label: "OpenAI",
            model: "gpt-3.5-turbo-0125",
            credential_var: "OPENAI_API_KEY",
            endpoint: None,
            extra_headers: Vec::new(),
        }
    }

    /// xAI Grok (`grok-2`).
    pub fn grok() -> Self {
        Self {
            label: "Grok",
            model: "grok-2",
            credential_var: "GROK_API_KEY",
            ..Self::openai()
        }
    }

    /// OpenRouter (`openai/gpt-3.5-turbo`), with its attribution headers.
    pub fn openrouter() -> Self {
        Self {
            label: "OpenRouter",
            model: "openai/gpt-3.5-turbo",
            credential_var: "OPENROUTER_API_KEY",
            endpoint: None,
            extra_headers: vec![
                ("HTTP-Referer", "http://localhost:5231"),
                ("X-Title", "PromptBridge"),
            ],
        }
    }

    /// Vercel (`gpt-3.5-turbo`). Ignores the provider's base URL.
    pub fn vercel() -> Self {
        Self {
            label: "Vercel",
            model: "gpt-3.5-turbo",
            credential_var: "VERCEL_API_KEY",
            endpoint: Some("https://api.vercel.com/v1/chat/completions".to_string()),
            extra_headers: Vec::new(),
        }
    }

    /// Post to `url` instead of deriving the endpoint from the base URL.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn model(&self) -> &'static str {
        self.model
    }

    fn url(&self, base_url: &str) -> String {
        match self.endpoint {
            Some(ref url) => url.clone(),
            None => format!("{}/chat/completions", base_url.trim_end_matches('/')),
        }
    }

    /// Build the request body for `/chat/completions`.
    fn build_body(&self, request: &LlmRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        })
    }

    /// Build the reqwest request with this flavor's headers.
    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        key: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).bearer_auth(key).json(body);
        for (name, value) in &self.extra_headers {
            req = req.header(*name, *value);
        }
        req
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let key = request.require_key(self.label, self.credential_var)?;
        let url = self.url(base_url);
        let body = self.build_body(request);

        let (status, text) = send(
            self.label,
            self.build_http_request(client, &url, key, &body),
        )
        .await?;
        finish(self.label, ResponseShape::ChatCompletions, status, &text)
    }

    fn name(&self) -> &'static str {
        self.label
    }

    fn credential_var(&self) -> Option<&'static str> {
        Some(self.credential_var)
    }
}
