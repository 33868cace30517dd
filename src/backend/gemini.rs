//! Backend for Google Gemini `generateContent`.
//!
//! Endpoint: `{base}/models/gemini-1.5-flash:generateContent?key={key}`.
//! Gemini authenticates by query parameter; no auth header is sent.

use super::{finish, send, Backend, LlmRequest, LlmResponse, ResponseShape};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const PROVIDER: &str = "Gemini";
const CREDENTIAL_VAR: &str = "GEMINI_API_KEY";
const MODEL: &str = "gemini-1.5-flash";

/// Backend for Google Gemini.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiBackend;

impl GeminiBackend {
    fn build_body(request: &LlmRequest) -> Value {
        json!({
            "contents": [{"parts": [{"text": request.prompt}]}],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 1000,
                "topP": 0.8,
                "topK": 40,
            },
        })
    }

    fn build_http_request(
        client: &Client,
        base_url: &str,
        key: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            MODEL
        );
        client.post(url).query(&[("key", key)]).json(body)
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let key = request.require_key(PROVIDER, CREDENTIAL_VAR)?;
        let body = Self::build_body(request);

        let (status, text) = send(
            PROVIDER,
            Self::build_http_request(client, base_url, key, &body),
        )
        .await?;
        finish(PROVIDER, ResponseShape::Gemini, status, &text)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn credential_var(&self) -> Option<&'static str> {
        Some(CREDENTIAL_VAR)
    }
}
