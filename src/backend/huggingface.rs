//! Backend for the Hugging Face Inference API.
//!
//! Endpoint: `{base}/models/gpt2`. The reply is a JSON list of generations;
//! the first one's `generated_text` is used.

use super::{finish, send, Backend, LlmRequest, LlmResponse, ResponseShape};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const PROVIDER: &str = "HuggingFace";
const CREDENTIAL_VAR: &str = "HUGGINGFACE_API_KEY";

#[derive(Debug, Clone, Copy, Default)]
pub struct HuggingFaceBackend;

impl HuggingFaceBackend {
    fn build_body(request: &LlmRequest) -> Value {
        json!({
            "inputs": request.prompt,
            "parameters": {
                "max_new_tokens": 1000,
                "temperature": 0.7,
                "top_p": 0.95,
            },
        })
    }
}

#[async_trait]
impl Backend for HuggingFaceBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let key = request.require_key(PROVIDER, CREDENTIAL_VAR)?;
        let url = format!("{}/models/gpt2", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);

        let (status, text) = send(PROVIDER, client.post(&url).bearer_auth(key).json(&body)).await?;
        finish(PROVIDER, ResponseShape::HuggingFace, status, &text)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn credential_var(&self) -> Option<&'static str> {
        Some(CREDENTIAL_VAR)
    }
}
