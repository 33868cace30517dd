//! Mock backend for testing without a live provider.
//!
//! [`MockBackend`] returns pre-configured replies in order and records every
//! prompt it receives, allowing deterministic tests of the registry and the
//! engine.
//!
//! # Example
//!
//! ```
//! use prompt_bridge::backend::{MockBackend, MockReply};
//!
//! let ok = MockBackend::fixed("Hello, world!");
//! let limited = MockBackend::new(vec![MockReply::Status(429, "slow down".into())]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::BridgeError;

/// One canned outcome of a [`MockBackend`] call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with this text.
    Text(String),
    /// Fail as if the provider answered with this status and body.
    Status(u16, String),
    /// Succeed at the HTTP level with no extractable text.
    Empty,
}

/// A test backend that returns canned replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    label: &'static str,
    replies: Vec<MockReply>,
    index: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockBackend {
    /// Create a mock backend with the given canned replies.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            label: "Mock",
            replies,
            index: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a mock that always returns the same text.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Text(text.into())])
    }

    /// Create a mock that always fails with `status`.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Status(status, body.into())])
    }

    /// Name reported in errors and audit logs. Default: `"Mock"`.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Sleep this long before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }
        let reply = self.next_reply();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Text(text) => Ok(LlmResponse {
                text,
                status: 200,
                metadata: None,
            }),
            MockReply::Status(429, body) => Err(BridgeError::RateLimited {
                provider: self.label,
                body,
            }),
            MockReply::Status(status, body) => Err(BridgeError::Provider {
                provider: self.label,
                status,
                body,
            }),
            MockReply::Empty => Err(BridgeError::Extraction {
                provider: self.label,
            }),
        }
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(mock: &MockBackend, prompt: &str) -> Result<LlmResponse> {
        mock.complete(&Client::new(), "http://unused", &LlmRequest::new(prompt))
            .await
    }

    #[tokio::test]
    async fn test_mock_fixed_response() {
        let mock = MockBackend::fixed("Hello!");
        let resp = call(&mock, "test").await.unwrap();
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn test_mock_cycles_replies() {
        let mock = MockBackend::new(vec![
            MockReply::Text("first".into()),
            MockReply::Text("second".into()),
        ]);
        assert_eq!(call(&mock, "a").await.unwrap().text, "first");
        assert_eq!(call(&mock, "b").await.unwrap().text, "second");
        assert_eq!(call(&mock, "c").await.unwrap().text, "first"); // cycles
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_status_replies() {
        let limited = MockBackend::failing(429, "{}").with_label("OpenAI");
        let err = call(&limited, "x").await.unwrap_err();
        assert!(err.is_rate_limited());

        let broken = MockBackend::failing(503, "down");
        let err = call(&broken, "x").await.unwrap_err();
        assert!(matches!(err, BridgeError::Provider { status: 503, .. }));

        let empty = MockBackend::new(vec![MockReply::Empty]);
        let err = call(&empty, "x").await.unwrap_err();
        assert!(matches!(err, BridgeError::Extraction { provider: "Mock" }));
    }
}
