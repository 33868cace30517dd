//! Typed provider response bodies.
//!
//! Each provider schema gets its own variant. Fields default when absent so
//! that a well-formed body missing the text field parses and is then
//! reported as [`BridgeError::Extraction`] rather than as a JSON error.

use crate::error::Result;
use crate::BridgeError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Which response schema to parse a body as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `choices[0].message.content` (OpenAI, Grok, OpenRouter, Vercel).
    ChatCompletions,
    /// `content[0].text`.
    Anthropic,
    /// `candidates[0].content.parts[0].text`.
    Gemini,
    /// `text`.
    Cohere,
    /// `[0].generated_text`.
    HuggingFace,
}

/// A parsed provider response body.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    ChatCompletions(ChatCompletion),
    Anthropic(AnthropicMessage),
    Gemini(GeminiResponse),
    Cohere(CohereChat),
    HuggingFace(Vec<HfGeneration>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatCompletion {
    #[serde(deserialize_with = "null_as_empty")]
    pub choices: Vec<ChatChoice>,
    pub model: Option<String>,
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicMessage {
    #[serde(deserialize_with = "null_as_empty")]
    pub content: Vec<AnthropicBlock>,
    pub model: Option<String>,
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnthropicBlock {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(deserialize_with = "null_as_empty")]
    pub candidates: Vec<GeminiCandidate>,
    pub usage_metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiContent {
    #[serde(deserialize_with = "null_as_empty")]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiPart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CohereChat {
    pub text: Option<String>,
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HfGeneration {
    pub generated_text: Option<String>,
}

impl ProviderResponse {
    /// Parse `body` as `shape`.
    ///
    /// Fails with [`BridgeError::Json`] if the body is not JSON or its top
    /// level has the wrong type (e.g. an object where a list is expected).
    pub fn parse(shape: ResponseShape, body: &str) -> Result<Self> {
        Ok(match shape {
            ResponseShape::ChatCompletions => Self::ChatCompletions(serde_json::from_str(body)?),
            ResponseShape::Anthropic => Self::Anthropic(serde_json::from_str(body)?),
            ResponseShape::Gemini => Self::Gemini(serde_json::from_str(body)?),
            ResponseShape::Cohere => Self::Cohere(serde_json::from_str(body)?),
            ResponseShape::HuggingFace => Self::HuggingFace(serde_json::from_str(body)?),
        })
    }

    /// The generated text, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        let text = match self {
            Self::ChatCompletions(r) => r.choices.first()?.message.as_ref()?.content.as_deref(),
            Self::Anthropic(r) => r.content.first()?.text.as_deref(),
            Self::Gemini(r) => r
                .candidates
                .first()?
                .content
                .as_ref()?
                .parts
                .first()?
                .text
                .as_deref(),
            Self::Cohere(r) => r.text.as_deref(),
            Self::HuggingFace(r) => r.first()?.generated_text.as_deref(),
        };
        text.filter(|t| !t.is_empty())
    }

    /// Take the generated text, or fail with [`BridgeError::Extraction`].
    pub fn into_text(self, provider: &'static str) -> Result<String> {
        match self.text() {
            Some(text) => Ok(text.to_string()),
            None => Err(BridgeError::Extraction { provider }),
        }
    }

    /// Usage and model information, where the provider reports it.
    pub fn metadata(&self) -> Option<Value> {
        match self {
            Self::ChatCompletions(r) => meta(r.model.as_deref(), r.usage.as_ref()),
            Self::Anthropic(r) => meta(r.model.as_deref(), r.usage.as_ref()),
            Self::Gemini(r) => meta(None, r.usage_metadata.as_ref()),
            Self::Cohere(r) => meta(None, r.meta.as_ref()),
            Self::HuggingFace(_) => None,
        }
    }
}

/// `null` lists read as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn meta(model: Option<&str>, usage: Option<&Value>) -> Option<Value> {
    let mut map = serde_json::Map::new();
    if let Some(model) = model {
        map.insert("model".into(), Value::String(model.to_string()));
    }
    if let Some(usage) = usage {
        map.insert("usage".into(), usage.clone());
    }
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(shape: ResponseShape, body: &str) -> Option<String> {
        ProviderResponse::parse(shape, body)
            .unwrap()
            .text()
            .map(str::to_string)
    }

    #[test]
    fn test_extracts_each_schema() {
        assert_eq!(
            text_of(
                ResponseShape::ChatCompletions,
                r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#
            )
            .as_deref(),
            Some("hi")
        );
        assert_eq!(
            text_of(
                ResponseShape::Anthropic,
                r#"{"content":[{"type":"text","text":"claude"}]}"#
            )
            .as_deref(),
            Some("claude")
        );
        assert_eq!(
            text_of(
                ResponseShape::Gemini,
                r#"{"candidates":[{"content":{"parts":[{"text":"gem"}]}}]}"#
            )
            .as_deref(),
            Some("gem")
        );
        assert_eq!(
            text_of(ResponseShape::Cohere, r#"{"text":"co"}"#).as_deref(),
            Some("co")
        );
        assert_eq!(
            text_of(ResponseShape::HuggingFace, r#"[{"generated_text":"hf"}]"#).as_deref(),
            Some("hf")
        );
    }

    #[test]
    fn test_missing_text_is_extraction_error() {
        let parsed = ProviderResponse::parse(ResponseShape::ChatCompletions, r#"{"choices":[]}"#)
            .unwrap();
        let err = parsed.into_text("OpenAI").unwrap_err();
        assert!(matches!(err, BridgeError::Extraction { provider: "OpenAI" }));
        assert_eq!(err.to_string(), "OpenAI response contained no generated text");
    }

    #[test]
    fn test_null_content_is_extraction_error() {
        let parsed = ProviderResponse::parse(
            ResponseShape::ChatCompletions,
            r#"{"choices":[{"message":{"content":null}}]}"#,
        )
        .unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_null_nested_objects_are_extraction_errors() {
        let bodies = [
            (ResponseShape::ChatCompletions, r#"{"choices":[{"message":null}]}"#),
            (ResponseShape::ChatCompletions, r#"{"choices":null}"#),
            (ResponseShape::Anthropic, r#"{"content":null}"#),
            (ResponseShape::Gemini, r#"{"candidates":[{"content":null}]}"#),
            (ResponseShape::Gemini, r#"{"candidates":[{"content":{"parts":null}}]}"#),
        ];
        for (shape, body) in bodies {
            let err = ProviderResponse::parse(shape, body)
                .unwrap()
                .into_text("Test")
                .unwrap_err();
            assert!(matches!(err, BridgeError::Extraction { .. }), "{body}");
        }
    }

    #[test]
    fn test_wrong_top_level_is_json_error() {
        let err = ProviderResponse::parse(ResponseShape::HuggingFace, r#"{"error":"loading"}"#)
            .unwrap_err();
        assert!(matches!(err, BridgeError::Json(_)));
    }

    #[test]
    fn test_metadata_collects_usage() {
        let parsed = ProviderResponse::parse(
            ResponseShape::ChatCompletions,
            r#"{"model":"gpt-3.5-turbo-0125","usage":{"total_tokens":9},"choices":[{"message":{"content":"x"}}]}"#,
        )
        .unwrap();
        let meta = parsed.metadata().unwrap();
        assert_eq!(meta["model"], "gpt-3.5-turbo-0125");
        assert_eq!(meta["usage"]["total_tokens"], 9);

        let hf = ProviderResponse::parse(ResponseShape::HuggingFace, "[]").unwrap();
        assert!(hf.metadata().is_none());
    }
}
