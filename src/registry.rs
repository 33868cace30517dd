//! Provider lookup and dispatch.
//!
//! [`ProviderRegistry`] resolves a provider id to its stored record, picks
//! the adapter registered under the record's (case-insensitive) name, runs
//! the call under the execution context's cancellation and deadline, and
//! writes one [`ProviderCall`] audit row per dispatched call.

use crate::backend::{
    AnthropicBackend, Backend, CohereBackend, GeminiBackend, HuggingFaceBackend, LlmRequest,
    OpenAiBackend,
};
use crate::error::Result;
use crate::events::{emit, Event};
use crate::exec_ctx::ExecCtx;
use crate::store::Store;
use crate::types::{CallStatus, ProviderCall, ProviderRecord};
use crate::BridgeError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Maps provider names to adapters and dispatches calls.
#[derive(Clone)]
pub struct ProviderRegistry {
    store: Arc<dyn Store>,
    adapters: HashMap<String, Arc<dyn Backend>>,
}

impl ProviderRegistry {
    /// A registry with no adapters. Use [`register`](Self::register) to add some.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            adapters: HashMap::new(),
        }
    }

    /// A registry with an adapter for every provider in [`default_catalog`].
    pub fn with_default_adapters(store: Arc<dyn Store>) -> Self {
        Self::new(store)
            .register("OpenAI GPT", Arc::new(OpenAiBackend::openai()))
            .register("Anthropic Claude", Arc::new(AnthropicBackend))
            .register("Google Gemini", Arc::new(GeminiBackend))
            .register("Grok", Arc::new(OpenAiBackend::grok()))
            .register("OpenRouter", Arc::new(OpenAiBackend::openrouter()))
            .register("Cohere", Arc::new(CohereBackend))
            .register("HuggingFace", Arc::new(HuggingFaceBackend))
            .register("Vercel", Arc::new(OpenAiBackend::vercel()))
    }

    /// Register (or replace) the adapter for providers named `name`.
    pub fn register(mut self, name: &str, backend: Arc<dyn Backend>) -> Self {
        self.adapters.insert(name.to_lowercase(), backend);
        self
    }

    /// The adapter for a provider name, matched case-insensitively.
    pub fn adapter_for(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.adapters.get(&name.to_lowercase()).cloned()
    }

    /// The stored provider record for `provider_id`, if any.
    pub async fn provider(&self, provider_id: u64) -> Result<Option<ProviderRecord>> {
        Ok(self.store.get_provider(provider_id).await?)
    }

    /// Providers currently available for dispatch, ordered by id.
    pub async fn active_providers(&self) -> Result<Vec<ProviderRecord>> {
        let mut providers = self.store.list_providers().await?;
        providers.retain(|p| p.is_active);
        Ok(providers)
    }

    /// Send `prompt` to provider `provider_id` on behalf of `caller_id`.
    ///
    /// Unknown and inactive providers are rejected before anything is sent
    /// or recorded. Once a provider resolves, the call is audited whatever
    /// its outcome.
    pub async fn send(
        &self,
        ctx: &ExecCtx,
        provider_id: u64,
        prompt: &str,
        caller_id: u64,
    ) -> Result<String> {
        let provider = self
            .store
            .get_provider(provider_id)
            .await?
            .ok_or(BridgeError::ProviderNotFound(provider_id))?;
        if !provider.is_active {
            return Err(BridgeError::InactiveProvider(provider_id));
        }

        let adapter = self.adapter_for(&provider.name);
        let label = adapter
            .as_ref()
            .map(|a| a.name().to_string())
            .unwrap_or_else(|| provider.name.clone());

        let created_at = Utc::now();
        let start = Instant::now();
        let outcome = match adapter {
            Some(backend) => self.dispatch(ctx, backend.as_ref(), &provider, prompt).await,
            None => Err(BridgeError::UnsupportedProvider(provider.name.clone())),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => tracing::debug!(provider_id, provider = %label, elapsed_ms, "provider call completed"),
            Err(e) => tracing::warn!(provider_id, provider = %label, elapsed_ms, error = %e, "provider call failed"),
        }

        emit(
            &ctx.event_handler,
            Event::ProviderCall {
                provider_id,
                provider: label,
                ok: outcome.is_ok(),
                elapsed_ms,
            },
        );

        let audit = ProviderCall {
            id: 0,
            caller_id,
            provider_id,
            prompt: prompt.to_string(),
            response: outcome.as_ref().ok().cloned(),
            status: if outcome.is_ok() {
                CallStatus::Completed
            } else {
                CallStatus::Failed
            },
            created_at,
            completed_at: Utc::now(),
            response_time_ms: elapsed_ms,
            error_message: outcome.as_ref().err().map(|e| e.to_string()),
        };
        if let Err(e) = self.store.record_provider_call(audit).await {
            tracing::warn!(provider_id, error = %e, "failed to record provider call");
        }

        outcome
    }

    async fn dispatch(
        &self,
        ctx: &ExecCtx,
        backend: &dyn Backend,
        provider: &ProviderRecord,
        prompt: &str,
    ) -> Result<String> {
        let mut request = LlmRequest::new(prompt);
        if let Some(key) = backend
            .credential_var()
            .and_then(|var| ctx.credentials.get(var))
        {
            request = request.with_api_key(key);
        }

        let response = ctx
            .guard(backend.complete(&ctx.client, &provider.base_url, &request))
            .await?;
        Ok(response.text)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.adapters.keys().collect();
        names.sort();
        f.debug_struct("ProviderRegistry")
            .field("adapters", &names)
            .finish()
    }
}

/// The stock provider list. Gemini, OpenRouter and Cohere are active; the
/// rest are listed but disabled until switched on.
pub fn default_catalog() -> Vec<ProviderRecord> {
    let entry = |id, name: &str, base_url: &str, description: &str, is_active| ProviderRecord {
        id,
        name: name.to_string(),
        base_url: base_url.to_string(),
        description: Some(description.to_string()),
        is_active,
    };
    vec![
        entry(1, "OpenAI GPT", "https://api.openai.com/v1", "OpenAI GPT-3.5/4 API", false),
        entry(2, "Anthropic Claude", "https://api.anthropic.com/v1", "Anthropic Claude API", false),
        entry(3, "Google Gemini", "https://generativelanguage.googleapis.com/v1", "Google Gemini API", true),
        entry(4, "Grok", "https://api.x.ai/v1", "xAI Grok-2 API", false),
        entry(
            5,
            "OpenRouter",
            "https://openrouter.ai/api/v1",
            "OpenRouter - Multiple AI Models (OpenAI, Anthropic, Google, Meta)",
            true,
        ),
        entry(6, "Cohere", "https://api.cohere.ai/v1", "Cohere Command-R API", true),
        entry(7, "HuggingFace", "https://api-inference.huggingface.co", "HuggingFace Open Source AI Models", false),
        entry(
            8,
            "Vercel",
            "https://api.vercel.com/v1",
            "Vercel AI SDK - 100+ AI Models (OpenAI, Anthropic, xAI, Google, Meta)",
            false,
        ),
    ]
}
