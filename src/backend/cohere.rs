//! Backend for the Cohere v1 chat API. Endpoint: `{base}/chat`.

use super::{finish, send, Backend, LlmRequest, LlmResponse, ResponseShape};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const PROVIDER: &str = "Cohere";
const CREDENTIAL_VAR: &str = "COHERE_API_KEY";

#[derive(Debug, Clone, Copy, Default)]
pub struct CohereBackend;

impl CohereBackend {
    fn build_body(request: &LlmRequest) -> Value {
        json!({
            "model": "command-r",
            "message": request.prompt,
            "temperature": 0.7,
            "max_tokens": 1000,
        })
    }
}

#[async_trait]
impl Backend for CohereBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let key = request.require_key(PROVIDER, CREDENTIAL_VAR)?;
        let url = format!("{}/chat", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);

        let (status, text) = send(PROVIDER, client.post(&url).bearer_auth(key).json(&body)).await?;
        finish(PROVIDER, ResponseShape::Cohere, status, &text)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn credential_var(&self) -> Option<&'static str> {
        Some(CREDENTIAL_VAR)
    }
}
