//! Backend for the Anthropic Messages API.
//!
//! Endpoint: `{base}/messages`. The key is sent both as a bearer token and
//! as `x-api-key`, with a pinned `anthropic-version`.

use super::{finish, send, Backend, LlmRequest, LlmResponse, ResponseShape};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const PROVIDER: &str = "Anthropic";
const CREDENTIAL_VAR: &str = "ANTHROPIC_API_KEY";
const MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";

/// Backend for Anthropic Claude.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicBackend;

impl AnthropicBackend {
    fn build_body(request: &LlmRequest) -> Value {
        json!({
            "model": MODEL,
            "max_tokens": 1000,
            "messages": [{"role": "user", "content": request.prompt}],
        })
    }

    fn build_http_request(
        client: &Client,
        url: &str,
        key: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        client
            .post(url)
            .bearer_auth(key)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(body)
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let key = request.require_key(PROVIDER, CREDENTIAL_VAR)?;
        let url = format!("{}/messages", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);

        let (status, text) = send(
            PROVIDER,
            Self::build_http_request(client, &url, key, &body),
        )
        .await?;
        finish(PROVIDER, ResponseShape::Anthropic, status, &text)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn credential_var(&self) -> Option<&'static str> {
        Some(CREDENTIAL_VAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeError;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_payload_has_no_temperature() {
        let body = AnthropicBackend::build_body(&LlmRequest::new("hi"));
        assert_eq!(body["model"], "claude-3-haiku-20240307");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["content"], "hi");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_auth_headers() {
        let req = AnthropicBackend::build_http_request(
            &Client::new(),
            "https://api.anthropic.com/v1/messages",
            "ak-1",
            &json!({}),
        )
        .build()
        .expect("build request");
        assert_eq!(req.headers().get("Authorization").unwrap(), "Bearer ak-1");
        assert_eq!(req.headers().get("x-api-key").unwrap(), "ak-1");
        assert_eq!(req.headers().get("anthropic-version").unwrap(), "2023-06-01");
    }

    #[tokio::test]
    async fn test_complete_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-1"))
            .and(body_json(json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 1000,
                "messages": [{"role": "user", "content": "Summarize"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "A summary."}],
                "usage": {"input_tokens": 3, "output_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = AnthropicBackend
            .complete(
                &Client::new(),
                &format!("{}/v1", server.uri()),
                &LlmRequest::new("Summarize").with_api_key("ak-1"),
            )
            .await
            .unwrap();
        assert_eq!(resp.text, "A summary.");
    }

    #[tokio::test]
    async fn test_empty_content_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let err = AnthropicBackend
            .complete(
                &Client::new(),
                &server.uri(),
                &LlmRequest::new("x").with_api_key("ak-1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Extraction { provider: "Anthropic" }));
    }
}
